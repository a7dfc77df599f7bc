// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door and lock state.

use std::fmt;

/// State of a door, garage door, or lock portal.
///
/// The wire encoding is numeric: `0` is open, `1` is closed. Devices never
/// report [`DoorState::Unknown`]; it exists as the caller-side placeholder
/// before the first update arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DoorState {
    /// The portal is open (or the lock is released).
    Open,
    /// The portal is closed (or the lock is engaged).
    Closed,
    /// No update has been received yet.
    #[default]
    Unknown,
}

impl DoorState {
    /// Maps the numeric wire code to a state.
    ///
    /// Returns `None` for any code other than `0` or `1`; callers drop the
    /// message in that case.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns a lowercase label, suitable for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
