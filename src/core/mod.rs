// Core modules implementing the table container codec, planning, and error modeling.
pub mod codec;
pub mod cursor;
pub mod error;
pub mod format;
pub mod header;
pub mod plan;
pub mod pool;
pub mod row;
pub mod schema;
pub mod table;
pub mod validate;
pub mod value;
