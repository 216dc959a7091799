//! Containment and key existence.
//!
//! `contains(lhs, rhs)` holds when every part of `rhs` can be found in
//! `lhs` at the same nesting position:
//!
//! - every pair of an `rhs` object has a pair with the same key in the `lhs`
//!   object, whose value is an equal scalar or a container that in turn
//!   contains the `rhs` value;
//! - every scalar element of an `rhs` array equals some element of the `lhs`
//!   array, and every container element is contained by some container
//!   element of the `lhs` array. Order and multiplicity are ignored.
//!
//! Object keys are compared by id, so none of this needs the dictionary.

use crate::container::{Child, Container, ContainerView};
use crate::dict::KeyDictionary;
use crate::entry::{ContainerKind, EntryType};
use crate::error::{Error, Result};
use crate::value::Value;
use crate::MAX_DEPTH;

/// Whether `lhs` contains `rhs`.
///
/// At the root an object never contains, and is never contained by, anything
/// but an object. An array may contain a bare scalar, but a bare scalar
/// contains only an equal scalar.
pub fn contains(lhs: &Container, rhs: &Container) -> Result<bool> {
    if lhs.is_object() != rhs.is_object() {
        return Ok(false);
    }
    deep_contains(&lhs.view()?, &rhs.view()?, 1)
}

/// Whether `lhs` is contained in `rhs`.
pub fn contained(lhs: &Container, rhs: &Container) -> Result<bool> {
    contains(rhs, lhs)
}

fn deep_contains(lhs: &ContainerView, rhs: &ContainerView, depth: usize) -> Result<bool> {
    if depth > MAX_DEPTH {
        tracing::debug!(depth, "Containment nesting limit reached");
        return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
    }

    match (lhs.kind, rhs.kind) {
        (ContainerKind::Object, ContainerKind::Object) => object_contains(lhs, rhs, depth),
        (ContainerKind::Object, _) | (_, ContainerKind::Object) => Ok(false),
        (ContainerKind::Scalar, ContainerKind::Array) => Ok(false),
        _ => array_contains(lhs, rhs, depth),
    }
}

fn object_contains(lhs: &ContainerView, rhs: &ContainerView, depth: usize) -> Result<bool> {
    // Keys are unique, so a smaller object cannot hold every key of a larger one.
    if lhs.count() < rhs.count() {
        return Ok(false);
    }

    for wanted in &rhs.children {
        let Some(found) = lhs.find(wanted.key) else {
            return Ok(false);
        };
        let matched = match (found.is_container(), wanted.is_container()) {
            (true, true) => deep_contains(
                &found.container()?.view()?,
                &wanted.container()?.view()?,
                depth + 1,
            )?,
            (false, false) => scalars_equal(found, wanted)?,
            _ => false,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn array_contains(lhs: &ContainerView, rhs: &ContainerView, depth: usize) -> Result<bool> {
    // Container elements of lhs, gathered the first time rhs needs them.
    let mut lhs_containers: Option<Vec<ContainerView>> = None;

    for wanted in &rhs.children {
        if !wanted.is_container() {
            let mut any = false;
            for candidate in &lhs.children {
                if !candidate.is_container() && scalars_equal(candidate, wanted)? {
                    any = true;
                    break;
                }
            }
            if !any {
                return Ok(false);
            }
            continue;
        }

        if lhs_containers.is_none() {
            let mut views = Vec::new();
            for candidate in lhs.children.iter().filter(|c| c.is_container()) {
                views.push(candidate.container()?.view()?);
            }
            lhs_containers = Some(views);
        }
        let candidates = lhs_containers.as_deref().unwrap_or_default();
        if candidates.is_empty() {
            return Ok(false);
        }

        let wanted = wanted.container()?.view()?;
        let mut any = false;
        for candidate in candidates {
            if deep_contains(candidate, &wanted, depth + 1)? {
                any = true;
                break;
            }
        }
        if !any {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality of two scalar children. A small integer equals a numeric of the
/// same value.
fn scalars_equal(a: &Child, b: &Child) -> Result<bool> {
    let same_class = |t: EntryType| match t {
        EntryType::SmallInteger | EntryType::Numeric => EntryType::Numeric,
        other => other,
    };
    if same_class(a.entry.ty) != same_class(b.entry.ty) {
        return Ok(false);
    }
    match a.entry.ty {
        EntryType::Null | EntryType::BoolFalse | EntryType::BoolTrue => Ok(true),
        EntryType::String => Ok(a.data == b.data),
        _ => Ok(a.value()? == b.value()?),
    }
}

/// Whether `key` is a top-level key of an object, or a top-level string
/// element of an array (or the string of a bare scalar).
///
/// Looking up a name that has no id never assigns one.
pub fn exists(c: &Container, key: &str, dict: &KeyDictionary) -> Result<bool> {
    if c.is_object() {
        return match dict.find_id(key)? {
            Some(id) => Ok(c.view()?.find(id).is_some()),
            None => Ok(false),
        };
    }
    let view = c.view()?;
    Ok(view
        .children
        .iter()
        .any(|child| child.entry.ty == EntryType::String && &child.data[..] == key.as_bytes()))
}

/// Whether any of `keys` [`exists`] in `c`.
pub fn exists_any<S: AsRef<str>>(c: &Container, keys: &[S], dict: &KeyDictionary) -> Result<bool> {
    for key in keys {
        if exists(c, key.as_ref(), dict)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether all of `keys` [`exists`] in `c`. True for no keys.
pub fn exists_all<S: AsRef<str>>(c: &Container, keys: &[S], dict: &KeyDictionary) -> Result<bool> {
    for key in keys {
        if !exists(c, key.as_ref(), dict)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Value {
    /// Encode both trees and test containment.
    pub fn contains(&self, other: &Value) -> Result<bool> {
        contains(&crate::encode(self)?, &crate::encode(other)?)
    }
}
