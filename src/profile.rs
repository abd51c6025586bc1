//! Tree shape profiles and their reference text encoding.
//!
//! A profile captures the shape of a tree — every key at every level and
//! each leaf's payload count — without the payloads. Exporting the profile
//! of a populated tree and [`Tree::presize`]-ing a fresh tree from it
//! recreates the key structure and reserves leaf capacity ahead of a bulk
//! insertion, so the insertion itself never reallocates.
//!
//! The text encoding is a whitespace-separated pre-order walk: an internal
//! node writes its key count and keys, then its children; a leaf writes its
//! payload count. Collaborators with their own storage format can ignore
//! this encoding and drive [`Tree::profile`]/[`Tree::presize`] directly.

use crate::tree::Tree;
use std::fmt::Display;
use std::io::{self, Read, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Shape of an internal node: one entry per child, in key order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerProfile<K, P> {
    /// `(key, child shape)` pairs, ascending by key.
    pub entries: Vec<(K, P)>,
}

/// Shape of a leaf: its payload count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LeafProfile {
    /// Number of payloads the leaf held when profiled.
    pub len: usize,
}

/// Error raised by [`read_profile`].
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The underlying reader failed.
    #[error("i/o error reading profile: {0}")]
    Io(#[from] io::Error),

    /// A token did not parse as a key or count.
    #[error("unparsable profile token {token:?} at position {position}")]
    Parse {
        /// The offending token.
        token: String,
        /// Zero-based token position in the input.
        position: usize,
    },

    /// The input ended before the profile was complete.
    #[error("profile input ended prematurely")]
    Truncated,
}

/// Whitespace-separated token stream over a profile's text form.
pub struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    /// Wraps a text buffer.
    pub fn new(input: &'a str) -> Self {
        Self {
            iter: input.split_whitespace(),
            position: 0,
        }
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, ProfileError> {
        let token = self.iter.next().ok_or(ProfileError::Truncated)?;
        let position = self.position;
        self.position += 1;
        token.parse().map_err(|_| ProfileError::Parse {
            token: token.to_owned(),
            position,
        })
    }
}

/// Reference text encoding of a shape profile.
pub trait ProfileText: Sized {
    /// Appends this profile, pre-order, to `out`.
    fn write_into(&self, out: &mut String);

    /// Parses one profile from the token stream.
    fn read_from(tokens: &mut Tokens<'_>) -> Result<Self, ProfileError>;

    /// Number of nodes described, this one included.
    fn node_count(&self) -> usize;
}

impl ProfileText for LeafProfile {
    fn write_into(&self, out: &mut String) {
        out.push_str(&format!("{} ", self.len));
    }

    fn read_from(tokens: &mut Tokens<'_>) -> Result<Self, ProfileError> {
        Ok(Self {
            len: tokens.parse()?,
        })
    }

    fn node_count(&self) -> usize {
        1
    }
}

impl<K, P> ProfileText for LayerProfile<K, P>
where
    K: Display + FromStr,
    P: ProfileText,
{
    fn write_into(&self, out: &mut String) {
        out.push_str(&format!("{} ", self.entries.len()));
        for (key, _) in &self.entries {
            out.push_str(&format!("{key} "));
        }
        for (_, sub) in &self.entries {
            sub.write_into(out);
        }
    }

    fn read_from(tokens: &mut Tokens<'_>) -> Result<Self, ProfileError> {
        let num_keys: usize = tokens.parse()?;

        let mut keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            keys.push(tokens.parse::<K>()?);
        }

        let mut entries = Vec::with_capacity(num_keys);
        for key in keys {
            entries.push((key, P::read_from(tokens)?));
        }
        Ok(Self { entries })
    }

    fn node_count(&self) -> usize {
        1 + self.entries.iter().map(|(_, sub)| sub.node_count()).sum::<usize>()
    }
}

/// Writes `tree`'s shape profile to `writer` in the reference text form.
pub fn write_profile<T, W>(tree: &T, mut writer: W) -> io::Result<()>
where
    T: Tree,
    T::Profile: ProfileText,
    W: Write,
{
    let profile = tree.profile();
    let mut rendered = String::new();
    profile.write_into(&mut rendered);
    writer.write_all(rendered.trim_end().as_bytes())?;

    debug!(
        nodes = profile.node_count(),
        bytes = rendered.trim_end().len(),
        "wrote tree profile"
    );
    Ok(())
}

/// Reads a shape profile for trees of type `T` from `reader`.
pub fn read_profile<T, R>(mut reader: R) -> Result<T::Profile, ProfileError>
where
    T: Tree,
    T::Profile: ProfileText,
    R: Read,
{
    let mut buffer = String::new();
    reader.read_to_string(&mut buffer)?;

    let mut tokens = Tokens::new(&buffer);
    let profile = T::Profile::read_from(&mut tokens)?;

    debug!(nodes = profile.node_count(), "read tree profile");
    Ok(profile)
}

/// Reads a profile from `reader` and pre-sizes `tree` from it.
pub fn presize_from<T, R>(tree: &mut T, reader: R) -> Result<(), ProfileError>
where
    T: Tree,
    T::Profile: ProfileText,
    R: Read,
{
    let profile = read_profile::<T, R>(reader)?;
    tree.presize(&profile);
    Ok(())
}
