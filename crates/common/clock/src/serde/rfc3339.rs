/// Re-exported module
///
/// Use this module in combination with serde's [`#[with]`][with] attribute.
///
/// [with]: https://serde.rs/field-attrs.html#with
pub use time::serde::rfc3339::option;
