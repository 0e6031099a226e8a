//! Extra query parameters for the authorization redirect.

use crate::types::AuthorizationOptions;
use std::collections::BTreeMap;

/// Map strategy options to authorization request parameters.
///
/// `show_dialog` makes Salla prompt for consent again instead of silently
/// redirecting a user who already approved the app.
pub fn build_authorization_params(options: &AuthorizationOptions) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();

    if options.show_dialog {
        params.insert("show_dialog".to_string(), "true".to_string());
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_dialog() {
        let params = build_authorization_params(&AuthorizationOptions { show_dialog: true });
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("show_dialog").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_no_options() {
        assert!(build_authorization_params(&AuthorizationOptions::default()).is_empty());
        assert!(
            build_authorization_params(&AuthorizationOptions { show_dialog: false }).is_empty()
        );
    }
}
