//! Purpose: Define the stable public Rust API boundary for `@UTF` tables.
//! Exports: Codec entry points, the table model and accessors, validation reports, errors.
//! Role: Public, additive-only surface; hides the internal cursor, pool and row codecs.
//! Invariants: This module is the only public path to codec primitives.
//! Invariants: Internal modules remain private and are not directly exposed.

mod validation;

pub use crate::core::codec::{decode, encode, read_header};
pub use crate::core::cursor::Endian;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::header::TableHeader;
pub use crate::core::plan::{plan_layout, Layout};
pub use crate::core::schema::{Column, StorageClass};
pub use crate::core::table::{Row, Table};
pub use crate::core::value::{Scalar, Value, ValueType};
pub use validation::{validate_container, ValidationIssue, ValidationReport, ValidationStatus};
