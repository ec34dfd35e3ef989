//! The two-pass semantic analyzer: [`decls::SemaDecls`] registers every
//! top-level name, then [`defs::SemaDefs`] resolves typenames and types
//! every expression (§4.4, §4.5). [`symbol`] is the lexical scope stack
//! `SemaDefs` threads through a function body.

pub mod decls;
pub mod defs;
pub mod symbol;
