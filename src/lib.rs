//! RustyXML Value - offset-preserving decoding of XML values
//!
//! Maps between the decoded text of an attribute value or element text and
//! its physical source, and plans edits made in decoded coordinates:
//! - core: spans, scanning, reference decoding, entity declarations
//! - mapping: decoder, offset index, edit planner, cache, encoders
//! - strategy: parallel batch decode (decode_many)
//!
//! The NIF surface keeps each value in a ResourceArc (value_*).

use rustler::{Atom, Binary, Encoder, Env, ResourceArc, Term};
use std::sync::Arc;

pub mod core;
pub mod error;
pub mod mapping;
pub mod strategy;

mod resource;
mod term;

use crate::core::dtd::EntityTable;
use crate::core::entities::BuiltinEntities;
use crate::core::scanner::ScanOptions;
use error::ValueError;
use mapping::XmlValue;
use resource::{ValueRef, ValueResource};
use term::{error_to_term, gaps_to_term, kind_from_atom, outcome_to_term, reply, str_to_binary, strings_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Value Construction
// ============================================================================

fn build_value(kind: Atom, source: &[u8], origin: usize) -> Result<XmlValue, ValueError> {
    let kind = kind_from_atom(kind)?;
    let source = std::str::from_utf8(source)?;
    Ok(XmlValue::parse(kind, source, &ScanOptions::at(origin)))
}

fn new_value_term<'a>(env: Env<'a>, value: Result<XmlValue, ValueError>) -> Term<'a> {
    match value {
        Ok(value) => (term::ok(), ResourceArc::new(ValueResource::new(value))).encode(env),
        Err(e) => error_to_term(env, &e),
    }
}

/// Scan a value region (returns {:ok, ref} or {:error, reason})
#[rustler::nif]
fn value_new<'a>(env: Env<'a>, kind: Atom, source: Binary<'a>, origin: usize) -> Term<'a> {
    new_value_term(env, build_value(kind, source.as_slice(), origin))
}

/// Scan a value region, resolving entities declared in a DTD internal
/// subset
#[rustler::nif]
fn value_new_with_entities<'a>(
    env: Env<'a>,
    kind: Atom,
    source: Binary<'a>,
    origin: usize,
    subset: &str,
) -> Term<'a> {
    let value = EntityTable::parse(subset)
        .and_then(|table| table.validate().map(|_| table))
        .map_err(ValueError::InvalidDtd)
        .and_then(|table| {
            build_value(kind, source.as_slice(), origin).map(|v| v.with_resolver(Arc::new(table)))
        });
    new_value_term(env, value)
}

// ============================================================================
// Reads
// ============================================================================

/// Decoded text
#[rustler::nif]
fn value_decoded<'a>(env: Env<'a>, value: ValueRef) -> Term<'a> {
    reply(env, value.with_value(|v| str_to_binary(env, v.decoded())))
}

/// Current source text
#[rustler::nif]
fn value_source<'a>(env: Env<'a>, value: ValueRef) -> Term<'a> {
    reply(env, value.with_value(|v| str_to_binary(env, &v.source())))
}

/// Gap table as a list of tuples
#[rustler::nif]
fn value_gaps<'a>(env: Env<'a>, value: ValueRef) -> Term<'a> {
    reply(env, value.with_value(|v| gaps_to_term(env, v.snapshot().gaps())))
}

#[rustler::nif]
fn value_revision<'a>(env: Env<'a>, value: ValueRef) -> Term<'a> {
    reply(env, value.with_value(|v| v.revision().encode(env)))
}

/// Physical offset to decoded offset (nil when out of range)
#[rustler::nif]
fn value_physical_to_display<'a>(env: Env<'a>, value: ValueRef, physical: usize) -> Term<'a> {
    reply(env, value.with_value(|v| v.physical_to_display(physical).encode(env)))
}

/// Decoded offset to physical offset (nil when out of range)
#[rustler::nif]
fn value_display_to_physical<'a>(env: Env<'a>, value: ValueRef, display: usize) -> Term<'a> {
    reply(env, value.with_value(|v| v.display_to_physical(display).encode(env)))
}

// ============================================================================
// Writes
// ============================================================================

/// Insert text at a decoded offset (returns the outcome atom or nil)
#[rustler::nif]
fn value_insert<'a>(env: Env<'a>, value: ValueRef, text: &str, at: usize) -> Term<'a> {
    reply(env, value.with_value(|v| outcome_to_term(env, v.insert(text, at))))
}

/// Remove a decoded range (returns the outcome atom or nil)
#[rustler::nif]
fn value_remove<'a>(env: Env<'a>, value: ValueRef, start: usize, end: usize) -> Term<'a> {
    reply(env, value.with_value(|v| outcome_to_term(env, v.remove(start, end))))
}

/// Split into two new values, leaving the original untouched
/// (returns {left, right} or {:error, reason})
#[rustler::nif]
fn value_split<'a>(env: Env<'a>, value: ValueRef, at: usize) -> Term<'a> {
    let parts = value
        .with_value(|v| v.clone().split(at))
        .and_then(|parts| parts.map_err(|_| ValueError::NotCharBoundary));
    match parts {
        Ok((left, right)) => (
            ResourceArc::new(ValueResource::new(left)),
            ResourceArc::new(ValueResource::new(right)),
        )
            .encode(env),
        Err(e) => error_to_term(env, &e),
    }
}

/// Drop the cached decoded value
#[rustler::nif]
fn value_invalidate<'a>(env: Env<'a>, value: ValueRef) -> Term<'a> {
    reply(
        env,
        value.with_value(|v| {
            v.invalidate();
            term::ok().encode(env)
        }),
    )
}

// ============================================================================
// Parallel Batch Decode
// ============================================================================

/// Decode many independent sources in parallel
#[rustler::nif(schedule = "DirtyCpu")]
fn decode_many<'a>(env: Env<'a>, kind: Atom, sources: Vec<Binary<'a>>) -> Term<'a> {
    let decoded = kind_from_atom(kind).and_then(|kind| {
        let sources = sources
            .iter()
            .map(|b| std::str::from_utf8(b.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(strategy::decode_parallel(
            &sources,
            kind,
            &ScanOptions::default(),
            &BuiltinEntities,
        ))
    });
    reply(env, decoded.map(|strings| strings_to_term(env, &strings)))
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.RustyXML.Value.Native");
