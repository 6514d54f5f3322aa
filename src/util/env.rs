// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use std::env;
use std::ffi::OsStr;

/// Check if message tracing is enabled in the given environment variable.
///
/// Valid values: `all`, `in`, `out`.
///
/// Returns `false` if the variable is not defined or contains an invalid value.
pub fn tracing_from_env<K: AsRef<OsStr>>(key: K) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "all" | "in" | "out"))
        .unwrap_or_default()
}
