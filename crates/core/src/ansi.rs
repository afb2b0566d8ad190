// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal escape filtering for script output.
//!
//! Scripts often colorize output or redraw progress bars with carriage
//! returns. Neither renders sensibly in a browser log pane, so every chunk
//! of output goes through [`clean`] before it is relayed or recorded.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// ESC followed by either a single Fe byte (`ESC @` .. `ESC _`) or a CSI
/// sequence (`ESC [ params intermediates final`).
#[allow(clippy::expect_used)]
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("constant regex pattern is valid")
});

/// Strip ANSI escape sequences and turn every `\r` into `\n`.
///
/// Total and idempotent: `clean(&clean(x)) == clean(x)`. Input without
/// escapes or carriage returns is returned unchanged.
pub fn clean(text: &str) -> String {
    let mut out: Cow<'_, str> = Cow::Borrowed(text);
    // Removing one sequence can splice an ESC onto the start of another
    // (`ESC ESC [0m [0m`), so strip until nothing matches.
    while ANSI_ESCAPE.is_match(&out) {
        out = Cow::Owned(ANSI_ESCAPE.replace_all(&out, "").into_owned());
    }
    if out.contains('\r') {
        out = Cow::Owned(out.replace('\r', "\n"));
    }
    out.into_owned()
}

#[cfg(test)]
#[path = "ansi_tests.rs"]
mod tests;
