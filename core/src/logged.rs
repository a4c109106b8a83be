//! Results that carry accumulated errors and warnings.
//!
//! [`Logged`] threads diagnostics through a pipeline without aborting at the
//! first problem. A logged value is either a success with warnings or a
//! failure with errors and warnings; it never holds a value and errors at
//! the same time.
//!
//! # Example
//!
//! ```ignore
//! let header = parse_header(input);            // Logged<Header>
//! let mesh = header.and_then(|h| parse_body(h)); // diagnostics of both steps
//! for warning in mesh.warnings() {
//!     log::warn!("{warning}");
//! }
//! ```

use crate::diagnostic::{ParseError, ParseWarning};

/// A value with accumulated warnings, or accumulated errors and warnings.
#[derive(Debug, Clone, PartialEq)]
pub enum Logged<T, E = ParseError, W = ParseWarning> {
    Succeeded { value: T, warnings: Vec<W> },
    Failed { errors: Vec<E>, warnings: Vec<W> },
}

impl<T, E, W> Logged<T, E, W> {
    /// A success with no diagnostics.
    pub fn succeeded(value: T) -> Self {
        Self::Succeeded {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn succeeded_with_warnings(value: T, warnings: Vec<W>) -> Self {
        Self::Succeeded { value, warnings }
    }

    pub fn failed(errors: Vec<E>, warnings: Vec<W>) -> Self {
        Self::Failed { errors, warnings }
    }

    /// A failure caused by a single error.
    pub fn failed_with(error: E) -> Self {
        Self::Failed {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    /// Assemble a result from separately accumulated parts.
    ///
    /// Any error, or a missing value, yields a failure.
    pub fn from_parts(value: Option<T>, errors: Vec<E>, warnings: Vec<W>) -> Self {
        match value {
            Some(value) if errors.is_empty() => Self::Succeeded { value, warnings },
            _ => Self::Failed { errors, warnings },
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        !self.is_succeeded()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn errors(&self) -> &[E] {
        match self {
            Self::Succeeded { .. } => &[],
            Self::Failed { errors, .. } => errors,
        }
    }

    pub fn warnings(&self) -> &[W] {
        match self {
            Self::Succeeded { warnings, .. } | Self::Failed { warnings, .. } => warnings,
        }
    }

    /// Append a warning without changing the outcome.
    pub fn with_warning(mut self, warning: W) -> Self {
        match &mut self {
            Self::Succeeded { warnings, .. } | Self::Failed { warnings, .. } => {
                warnings.push(warning)
            }
        }
        self
    }

    /// Transform the value, keeping all diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Logged<U, E, W> {
        match self {
            Self::Succeeded { value, warnings } => Logged::Succeeded {
                value: f(value),
                warnings,
            },
            Self::Failed { errors, warnings } => Logged::Failed { errors, warnings },
        }
    }

    /// Sequence a second step after this one (monadic bind).
    ///
    /// The continuation runs only if this step succeeded. Diagnostics of both
    /// steps are concatenated in step order. If this step failed, its own
    /// diagnostics propagate unchanged.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Logged<U, E, W>) -> Logged<U, E, W> {
        match self {
            Self::Failed { errors, warnings } => Logged::Failed { errors, warnings },
            Self::Succeeded {
                value,
                warnings: mut first,
            } => match f(value) {
                Logged::Succeeded { value, warnings } => {
                    first.extend(warnings);
                    Logged::Succeeded {
                        value,
                        warnings: first,
                    }
                }
                Logged::Failed { errors, warnings } => {
                    first.extend(warnings);
                    Logged::Failed {
                        errors,
                        warnings: first,
                    }
                }
            },
        }
    }

    /// Split into a standard `Result`, keeping warnings on both sides.
    pub fn into_result(self) -> Result<(T, Vec<W>), (Vec<E>, Vec<W>)> {
        match self {
            Self::Succeeded { value, warnings } => Ok((value, warnings)),
            Self::Failed { errors, warnings } => Err((errors, warnings)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type L<T> = Logged<T, &'static str, &'static str>;

    #[test]
    fn test_succeeded_has_no_diagnostics() {
        let l: L<i32> = Logged::succeeded(3);
        assert!(l.is_succeeded());
        assert_eq!(l.value(), Some(&3));
        assert!(l.errors().is_empty());
        assert!(l.warnings().is_empty());
    }

    #[test]
    fn test_map_keeps_warnings() {
        let l: L<i32> = Logged::succeeded_with_warnings(2, vec!["w0"]);
        let mapped = l.map(|x| x * 10);
        assert_eq!(mapped, Logged::succeeded_with_warnings(20, vec!["w0"]));

        let f: L<i32> = Logged::failed(vec!["e0"], vec!["w0"]);
        assert_eq!(f.map(|x| x * 10), Logged::failed(vec!["e0"], vec!["w0"]));
    }

    #[test]
    fn test_and_then_concatenates_in_step_order() {
        let first: L<i32> = Logged::succeeded_with_warnings(1, vec!["w0"]);
        let result = first.and_then(|x| L::succeeded_with_warnings(x + 1, vec!["w1", "w2"]));
        assert_eq!(
            result,
            Logged::succeeded_with_warnings(2, vec!["w0", "w1", "w2"])
        );
    }

    #[test]
    fn test_and_then_second_step_fails() {
        let first: L<i32> = Logged::succeeded_with_warnings(1, vec!["w0"]);
        let result: L<i32> = first.and_then(|_| Logged::failed(vec!["e1"], vec!["w1"]));
        assert_eq!(result, Logged::failed(vec!["e1"], vec!["w0", "w1"]));
    }

    #[test]
    fn test_and_then_skips_continuation_after_failure() {
        let first: L<i32> = Logged::failed(vec!["e0"], vec!["w0"]);
        let mut called = false;
        let result: L<i32> = first.and_then(|x| {
            called = true;
            Logged::succeeded(x)
        });
        assert!(!called);
        assert_eq!(result, Logged::failed(vec!["e0"], vec!["w0"]));
    }

    #[test]
    fn test_from_parts() {
        let ok: L<i32> = Logged::from_parts(Some(5), vec![], vec!["w"]);
        assert_eq!(ok, Logged::succeeded_with_warnings(5, vec!["w"]));

        let with_errors: L<i32> = Logged::from_parts(Some(5), vec!["e"], vec![]);
        assert!(with_errors.is_failed());
        assert_eq!(with_errors.value(), None);

        let missing: L<i32> = Logged::from_parts(None, vec![], vec![]);
        assert!(missing.is_failed());
    }

    #[test]
    fn test_into_result() {
        let ok: L<i32> = Logged::succeeded_with_warnings(1, vec!["w"]);
        assert_eq!(ok.into_result(), Ok((1, vec!["w"])));

        let err: L<i32> = Logged::failed_with("e").with_warning("w");
        assert_eq!(err.into_result(), Err((vec!["e"], vec!["w"])));
    }
}
