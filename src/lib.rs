//! Purpose: Library crate for the `@UTF` table container codec used by `utftool` and tests.
//! Exports: `api` (decode/encode, table model, accessors, validation reports, errors).
//! Exports: `core` (cursor, pools, schema, row and header codecs, planning).
//! Role: Synchronous, I/O-free codec over caller-supplied byte buffers.
//! Invariants: Treat `core` as internal; `api` is the stable surface.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
