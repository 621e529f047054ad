// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace selection: turns `matchNamespace` / `avoidNamespaces` terms into a
//! concrete namespace set.
//!
//! A term is an exact namespace name, a comma-separated list of terms, or a glob
//! where `*` matches any run of characters and `?` exactly one. Globs are
//! anchored, so `team-*` is a prefix match and `*team*` a substring match.

use crate::error::{ClusterSecretError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

const MAX_NAMESPACE_LEN: usize = 63;

#[derive(Clone)]
enum Pattern {
    Exact(String),
    Glob { raw: String, regex: Regex },
}

impl Pattern {
    fn parse(piece: &str) -> Result<Self> {
        if piece.is_empty() {
            return Err(ClusterSecretError::InvalidSelector(
                "empty namespace term".to_string(),
            ));
        }

        if let Some(bad) = piece
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '*' | '?')))
        {
            return Err(ClusterSecretError::InvalidSelector(format!(
                "'{}' contains invalid character '{}'",
                piece, bad
            )));
        }

        if !piece.contains(['*', '?']) {
            if piece.len() > MAX_NAMESPACE_LEN {
                return Err(ClusterSecretError::InvalidSelector(format!(
                    "'{}' is longer than {} characters",
                    piece, MAX_NAMESPACE_LEN
                )));
            }
            return Ok(Pattern::Exact(piece.to_string()));
        }

        let mut expr = String::from("^");
        for c in piece.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            ClusterSecretError::InvalidSelector(format!("'{}' is not a valid glob: {}", piece, e))
        })?;

        Ok(Pattern::Glob {
            raw: piece.to_string(),
            regex,
        })
    }

    fn matches(&self, namespace: &str) -> bool {
        match self {
            Pattern::Exact(name) => name == namespace,
            Pattern::Glob { regex, .. } => regex.is_match(namespace),
        }
    }

    fn raw(&self) -> &str {
        match self {
            Pattern::Exact(name) => name,
            Pattern::Glob { raw, .. } => raw,
        }
    }
}

fn parse_terms(terms: &[String]) -> Result<Vec<Pattern>> {
    terms
        .iter()
        .flat_map(|term| term.split(','))
        .map(|piece| Pattern::parse(piece.trim()))
        .collect()
}

/// A parsed, validated namespace selector.
#[derive(Clone)]
pub struct MatchExpression {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MatchExpression {
    /// Parse include and exclude terms. At least one include term is required.
    pub fn parse(match_terms: &[String], avoid_terms: &[String]) -> Result<Self> {
        let include = parse_terms(match_terms)?;
        if include.is_empty() {
            return Err(ClusterSecretError::InvalidSelector(
                "matchNamespace must contain at least one term".to_string(),
            ));
        }

        Ok(Self {
            include,
            exclude: parse_terms(avoid_terms)?,
        })
    }

    pub fn matches(&self, namespace: &str) -> bool {
        self.include.iter().any(|p| p.matches(namespace))
            && !self.exclude.iter().any(|p| p.matches(namespace))
    }

    /// The subset of `live` this expression selects. Empty when nothing matches.
    pub fn resolve(&self, live: &BTreeSet<String>) -> BTreeSet<String> {
        live.iter().filter(|ns| self.matches(ns)).cloned().collect()
    }

    fn raw_include(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(Pattern::raw)
    }

    fn raw_exclude(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(Pattern::raw)
    }
}

impl PartialEq for MatchExpression {
    fn eq(&self, other: &Self) -> bool {
        self.raw_include().eq(other.raw_include()) && self.raw_exclude().eq(other.raw_exclude())
    }
}

impl fmt::Debug for MatchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchExpression")
            .field("include", &self.raw_include().collect::<Vec<_>>())
            .field("exclude", &self.raw_exclude().collect::<Vec<_>>())
            .finish()
    }
}
