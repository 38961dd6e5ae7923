//! Value-transform method catalogue for the request builder.
//!
//! The catalogue is a fixed, closed list: every entry names a transform the
//! request builder can apply to a field value (hashing, casing, substring,
//! concatenation). [`MethodPicker`] holds the selection and expansion state
//! the picker widget drives; [`apply`] executes a transform server-side.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::Md5;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use thiserror::Error;

/// Kind of parameter widget a method renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    /// Single free-text parameter.
    Input,
    /// Two parameters (start, length).
    DoubleInput,
    /// One parameter chosen from a fixed list.
    Select,
}

/// Static descriptor of one transform method. Immutable, not persisted.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Method {
    pub name: &'static str,
    pub has_params: bool,
    pub widget: Option<Widget>,
    pub default_params: &'static [&'static str],
    pub desc: &'static str,
}

/// Sub-algorithm choices for the `sha` method's select widget.
pub const SHA_VARIANTS: [&str; 5] = ["sha1", "sha224", "sha256", "sha384", "sha512"];

/// How many catalogue entries the picker shows before "show more".
pub const VISIBLE_COLLAPSED: usize = 4;

/// The transform catalogue, in display order.
pub static METHODS: [Method; 11] = [
    Method {
        name: "md5",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "MD5 encrypt",
    },
    Method {
        name: "lower",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "all letters to lowercase",
    },
    Method {
        name: "length",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "data length",
    },
    Method {
        name: "substr",
        has_params: true,
        widget: Some(Widget::DoubleInput),
        default_params: &[],
        desc: "partial string",
    },
    Method {
        name: "sha",
        has_params: true,
        widget: Some(Widget::Select),
        default_params: &["sha1"],
        desc: "SHA encrypt",
    },
    Method {
        name: "base64",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "base64 encrypt",
    },
    Method {
        name: "unbase64",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "base64 decrypt",
    },
    Method {
        name: "concat",
        has_params: true,
        widget: Some(Widget::Input),
        default_params: &[],
        desc: "Concat string",
    },
    Method {
        name: "lconcat",
        has_params: true,
        widget: Some(Widget::Input),
        default_params: &[],
        desc: "Left concat string",
    },
    Method {
        name: "upper",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "ALL LETTERS TO UPPERCASE",
    },
    Method {
        name: "number",
        has_params: false,
        widget: None,
        default_params: &[],
        desc: "string to number",
    },
];

/// Look up a catalogue entry by name.
pub fn lookup(name: &str) -> Option<&'static Method> {
    METHODS.iter().find(|m| m.name == name)
}

/// Catalogue position of a method, if it exists.
pub fn position(name: &str) -> Option<usize> {
    METHODS.iter().position(|m| m.name == name)
}

/// A parameter edit to be merged into the owning pipeline step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamChange {
    pub value: String,
    pub step_index: usize,
    pub param_index: usize,
}

/// Selection and expansion state of the method picker widget.
///
/// Collapsed, the picker shows the first [`VISIBLE_COLLAPSED`] catalogue
/// entries; `show_more` reveals the rest and the expansion is permanent for
/// the picker's lifetime.
#[derive(Clone, Debug)]
pub struct MethodPicker {
    expanded: bool,
    selected: Option<usize>,
    step_index: usize,
    /// Per-catalogue-entry parameter state, seeded from each method's
    /// declared defaults.
    params: Vec<Vec<String>>,
}

impl MethodPicker {
    /// Build a picker for one pipeline step. The initial expansion state is
    /// derived once from whether the selected method sits past the collapsed
    /// window.
    pub fn new(selected: Option<&str>, step_index: usize) -> Self {
        let selected = selected.and_then(position);
        let expanded = matches!(selected, Some(i) if i >= VISIBLE_COLLAPSED);
        let params = METHODS
            .iter()
            .map(|m| m.default_params.iter().map(|p| p.to_string()).collect())
            .collect();
        Self {
            expanded,
            selected,
            step_index,
            params,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Reveal the full catalogue. There is no collapse transition.
    pub fn show_more(&mut self) {
        self.expanded = true;
    }

    /// The catalogue entries currently visible.
    pub fn visible(&self) -> &'static [Method] {
        if self.expanded {
            &METHODS
        } else {
            &METHODS[..VISIBLE_COLLAPSED]
        }
    }

    /// The selected method, if any.
    pub fn selected(&self) -> Option<&'static Method> {
        self.selected.map(|i| &METHODS[i])
    }

    /// Current parameters of the selected method.
    pub fn selected_params(&self) -> &[String] {
        match self.selected {
            Some(i) => &self.params[i],
            None => &[],
        }
    }

    /// Select a visible method by name. Returns false if the name is unknown
    /// or currently hidden behind "show more".
    pub fn select(&mut self, name: &str) -> bool {
        match position(name) {
            Some(i) if i < self.visible().len() => {
                self.selected = Some(i);
                true
            }
            _ => false,
        }
    }

    /// Record a parameter edit on the selected method and produce the change
    /// event the owning step merges. Returns None when there is no selection
    /// or the method takes no parameters.
    pub fn edit_param(&mut self, value: &str, param_index: usize) -> Option<ParamChange> {
        let i = self.selected?;
        if !METHODS[i].has_params {
            return None;
        }
        let params = &mut self.params[i];
        if params.len() <= param_index {
            params.resize(param_index + 1, String::new());
        }
        params[param_index] = value.to_string();
        Some(ParamChange {
            value: value.to_string(),
            step_index: self.step_index,
            param_index,
        })
    }
}

/// Error applying a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("bad parameter: {0}")]
    BadParam(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Apply a catalogue transform to a value.
pub fn apply(name: &str, params: &[String], input: &str) -> Result<String, TransformError> {
    match name {
        "md5" => Ok(hex::encode(Md5::digest(input.as_bytes()))),
        "lower" => Ok(input.to_lowercase()),
        "length" => Ok(input.chars().count().to_string()),
        "substr" => {
            let start: usize = param(params, 0)?
                .parse()
                .map_err(|_| TransformError::BadParam("start must be a number".into()))?;
            let len: usize = param(params, 1)?
                .parse()
                .map_err(|_| TransformError::BadParam("length must be a number".into()))?;
            Ok(input.chars().skip(start).take(len).collect())
        }
        "sha" => {
            let variant = params.first().map(String::as_str).unwrap_or("sha1");
            match variant {
                "sha1" => Ok(hex::encode(Sha1::digest(input.as_bytes()))),
                "sha224" => Ok(hex::encode(Sha224::digest(input.as_bytes()))),
                "sha256" => Ok(hex::encode(Sha256::digest(input.as_bytes()))),
                "sha384" => Ok(hex::encode(Sha384::digest(input.as_bytes()))),
                "sha512" => Ok(hex::encode(Sha512::digest(input.as_bytes()))),
                other => Err(TransformError::BadParam(format!(
                    "unknown sha variant: {}",
                    other
                ))),
            }
        }
        "base64" => Ok(BASE64.encode(input.as_bytes())),
        "unbase64" => {
            let bytes = BASE64
                .decode(input.as_bytes())
                .map_err(|e| TransformError::InvalidInput(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| TransformError::InvalidInput(e.to_string()))
        }
        "concat" => {
            let suffix = params.first().map(String::as_str).unwrap_or("");
            Ok(format!("{}{}", input, suffix))
        }
        "lconcat" => {
            let prefix = params.first().map(String::as_str).unwrap_or("");
            Ok(format!("{}{}", prefix, input))
        }
        "upper" => Ok(input.to_uppercase()),
        "number" => {
            let n: f64 = input
                .trim()
                .parse()
                .map_err(|_| TransformError::InvalidInput(format!("not a number: {}", input)))?;
            Ok(n.to_string())
        }
        other => Err(TransformError::UnknownMethod(other.to_string())),
    }
}

fn param(params: &[String], index: usize) -> Result<&str, TransformError> {
    params
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| TransformError::BadParam(format!("missing parameter {}", index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ───────────────────────────── Catalogue ─────────────────────────────

    #[test]
    fn test_catalogue_has_eleven_entries_in_order() {
        let names: Vec<&str> = METHODS.iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "md5", "lower", "length", "substr", "sha", "base64", "unbase64", "concat",
                "lconcat", "upper", "number"
            ]
        );
    }

    #[test]
    fn test_widget_kinds_match_catalogue() {
        assert_eq!(lookup("substr").unwrap().widget, Some(Widget::DoubleInput));
        assert_eq!(lookup("sha").unwrap().widget, Some(Widget::Select));
        assert_eq!(lookup("concat").unwrap().widget, Some(Widget::Input));
        assert_eq!(lookup("lconcat").unwrap().widget, Some(Widget::Input));
        assert_eq!(lookup("md5").unwrap().widget, None);
    }

    #[test]
    fn test_parameterless_methods_declare_no_params() {
        for m in METHODS.iter().filter(|m| !m.has_params) {
            assert!(m.widget.is_none(), "{} should have no widget", m.name);
            assert!(m.default_params.is_empty());
        }
    }

    #[test]
    fn test_sha_defaults_to_sha1() {
        assert_eq!(lookup("sha").unwrap().default_params, &["sha1"]);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("rot13").is_none());
        assert!(position("rot13").is_none());
    }

    // ───────────────────────────── Picker ─────────────────────────────

    #[test]
    fn test_picker_collapsed_shows_first_four() {
        let picker = MethodPicker::new(None, 0);
        assert!(!picker.is_expanded());
        let names: Vec<&str> = picker.visible().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["md5", "lower", "length", "substr"]);
    }

    #[test]
    fn test_picker_show_more_reveals_all_and_sticks() {
        let mut picker = MethodPicker::new(None, 0);
        picker.show_more();
        assert!(picker.is_expanded());
        assert_eq!(picker.visible().len(), METHODS.len());
        // No collapse transition exists
        picker.show_more();
        assert!(picker.is_expanded());
        assert_eq!(picker.visible().len(), METHODS.len());
    }

    #[test]
    fn test_picker_starts_expanded_for_late_selection() {
        // "sha" is index 4, past the collapsed window
        let picker = MethodPicker::new(Some("sha"), 0);
        assert!(picker.is_expanded());

        // "substr" is index 3, inside the window
        let picker = MethodPicker::new(Some("substr"), 0);
        assert!(!picker.is_expanded());
    }

    #[test]
    fn test_picker_unknown_selection_stays_collapsed() {
        let picker = MethodPicker::new(Some("rot13"), 0);
        assert!(!picker.is_expanded());
        assert!(picker.selected().is_none());
    }

    #[test]
    fn test_picker_select_hidden_method_fails_until_expanded() {
        let mut picker = MethodPicker::new(None, 0);
        assert!(!picker.select("upper"));
        assert!(picker.selected().is_none());

        picker.show_more();
        assert!(picker.select("upper"));
        assert_eq!(picker.selected().unwrap().name, "upper");
    }

    #[test]
    fn test_picker_param_edit_propagates_step_and_index() {
        let mut picker = MethodPicker::new(Some("substr"), 2);
        assert!(picker.select("substr"));

        let change = picker.edit_param("5", 0).unwrap();
        assert_eq!(
            change,
            ParamChange {
                value: "5".into(),
                step_index: 2,
                param_index: 0,
            }
        );
        let change = picker.edit_param("3", 1).unwrap();
        assert_eq!(change.param_index, 1);
        assert_eq!(picker.selected_params(), &["5", "3"]);
    }

    #[test]
    fn test_picker_param_edit_rejected_without_params() {
        let mut picker = MethodPicker::new(Some("md5"), 0);
        assert!(picker.select("md5"));
        assert!(picker.edit_param("x", 0).is_none());
    }

    #[test]
    fn test_picker_sha_params_seed_from_default() {
        let mut picker = MethodPicker::new(Some("sha"), 0);
        assert!(picker.select("sha"));
        assert_eq!(picker.selected_params(), &["sha1"]);
    }

    // ───────────────────────────── apply ─────────────────────────────

    #[test]
    fn test_apply_md5() {
        assert_eq!(
            apply("md5", &[], "abc").unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_apply_sha_variants() {
        assert_eq!(
            apply("sha", &[], "abc").unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            apply("sha", &["sha256".into()], "abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(matches!(
            apply("sha", &["sha3".into()], "abc"),
            Err(TransformError::BadParam(_))
        ));
    }

    #[test]
    fn test_apply_casing_and_length() {
        assert_eq!(apply("lower", &[], "AbC").unwrap(), "abc");
        assert_eq!(apply("upper", &[], "AbC").unwrap(), "ABC");
        assert_eq!(apply("length", &[], "héllo").unwrap(), "5");
    }

    #[test]
    fn test_apply_substr_by_chars() {
        let params = vec!["1".to_string(), "3".to_string()];
        assert_eq!(apply("substr", &params, "abcdef").unwrap(), "bcd");
        // Char offsets, not bytes
        assert_eq!(apply("substr", &params, "héllo").unwrap(), "éll");
    }

    #[test]
    fn test_apply_substr_bad_params() {
        assert!(matches!(
            apply("substr", &[], "abc"),
            Err(TransformError::BadParam(_))
        ));
        let params = vec!["x".to_string(), "3".to_string()];
        assert!(matches!(
            apply("substr", &params, "abc"),
            Err(TransformError::BadParam(_))
        ));
    }

    #[test]
    fn test_apply_base64_roundtrip() {
        let encoded = apply("base64", &[], "hello world").unwrap();
        assert_eq!(encoded, "aGVsbG8gd29ybGQ=");
        assert_eq!(apply("unbase64", &[], &encoded).unwrap(), "hello world");
        assert!(matches!(
            apply("unbase64", &[], "!!not base64!!"),
            Err(TransformError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_concat() {
        let params = vec!["-suffix".to_string()];
        assert_eq!(apply("concat", &params, "value").unwrap(), "value-suffix");
        let params = vec!["prefix-".to_string()];
        assert_eq!(apply("lconcat", &params, "value").unwrap(), "prefix-value");
        // Missing param concatenates nothing
        assert_eq!(apply("concat", &[], "value").unwrap(), "value");
    }

    #[test]
    fn test_apply_number() {
        assert_eq!(apply("number", &[], "42").unwrap(), "42");
        assert_eq!(apply("number", &[], " 3.5 ").unwrap(), "3.5");
        assert!(matches!(
            apply("number", &[], "forty-two"),
            Err(TransformError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_unknown_method() {
        assert!(matches!(
            apply("rot13", &[], "abc"),
            Err(TransformError::UnknownMethod(_))
        ));
    }
}
