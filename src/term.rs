//! Elixir Term Conversion Utilities
//!
//! Converts value state and edit results to Elixir terms.

use crate::error::ValueError;
use crate::mapping::{EditOutcome, Gap, ValueKind};
use rustler::{Atom, Encoder, Env, NewBinary, Term};

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    unchanged,
    in_place,
    replaced,
    deleted,
    text,
    attribute,
}

/// Map a kind atom (`:text` or `:attribute`) to a value kind
pub fn kind_from_atom(kind: Atom) -> Result<ValueKind, ValueError> {
    if kind == text() {
        Ok(ValueKind::Text)
    } else if kind == attribute() {
        Ok(ValueKind::Attribute)
    } else {
        Err(ValueError::UnknownKind)
    }
}

/// Convert an edit result to an atom, or `nil` for a rejected edit
pub fn outcome_to_term<'a>(env: Env<'a>, outcome: Option<EditOutcome>) -> Term<'a> {
    let atom = match outcome {
        Some(EditOutcome::Unchanged) => unchanged(),
        Some(EditOutcome::InPlace) => in_place(),
        Some(EditOutcome::Replaced) => replaced(),
        Some(EditOutcome::Deleted) => deleted(),
        None => return rustler::types::atom::nil().encode(env),
    };
    atom.encode(env)
}

/// Convert gaps to a list of
/// `{display_start, physical_start, display_len, physical_len, shift}`
pub fn gaps_to_term<'a>(env: Env<'a>, gaps: &[Gap]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for gap in gaps.iter().rev() {
        let tuple = (
            gap.display_start,
            gap.physical_start,
            gap.display_len,
            gap.physical_len,
            gap.shift as i64,
        );
        list = list.list_prepend(tuple.encode(env));
    }
    list
}

/// Convert strings to a list of binaries
pub fn strings_to_term<'a>(env: Env<'a>, strings: &[String]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for s in strings.iter().rev() {
        list = list.list_prepend(str_to_binary(env, s));
    }
    list
}

/// `{:error, reason}`
pub fn error_to_term<'a>(env: Env<'a>, err: &ValueError) -> Term<'a> {
    (error(), err.to_string()).encode(env)
}

/// The term itself, or `{:error, reason}`
pub fn reply<'a>(env: Env<'a>, result: Result<Term<'a>, ValueError>) -> Term<'a> {
    result.unwrap_or_else(|err| error_to_term(env, &err))
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}
