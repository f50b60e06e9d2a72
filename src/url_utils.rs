// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for building redirect URLs.

/// Append percent-encoded query parameters to `base`, preserving any query it
/// already carries.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base.contains('?') {
        if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };

    format!("{}{}{}", base, separator, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query_plain_base() {
        assert_eq!(
            with_query("https://a.example/cb", &[("code", "x y"), ("state", "s&t")]),
            "https://a.example/cb?code=x%20y&state=s%26t"
        );
    }

    #[test]
    fn test_with_query_existing_query() {
        assert_eq!(
            with_query("https://a.example/cb?tenant=1", &[("code", "c")]),
            "https://a.example/cb?tenant=1&code=c"
        );
        assert_eq!(with_query("https://a.example/cb", &[]), "https://a.example/cb");
    }
}
