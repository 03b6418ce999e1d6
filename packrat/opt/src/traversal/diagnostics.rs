use packrat_utils::{Error, PackratResult};

use super::{Action, VisResult};

/// A pass that implements reporting Diagnostics
pub trait DiagnosticPass {
    /// Return an iterator of the diagnostics gathered by this pass.
    fn diagnostics(&self) -> &DiagnosticContext;
}

/// A type for accumulating multiple errors
#[derive(Default, Debug)]
pub struct DiagnosticContext {
    errors: Vec<Error>,
    warnings: Vec<Error>,
}

impl DiagnosticContext {
    /// Report an `error`
    pub fn err(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Report a `warning`
    pub fn warning(&mut self, warning: Error) {
        self.warnings.push(warning)
    }

    /// Accumulates `error` into the context, and returns `Ok(Action::Continue)`.
    /// This is useful for when we need to raise an Error because we couldn't
    /// construct some value that we needed to continue the computation.
    pub fn early_return_err(&mut self, error: Error) -> VisResult {
        self.err(error);
        Ok(Action::Continue)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warning_iter(&self) -> impl Iterator<Item = &Error> {
        self.warnings.iter()
    }

    pub fn errors_iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }
}

/// Accumuate the error in a [`Result`] type into the [`DiagnosticContext`].
pub trait DiagnosticResult {
    fn accumulate_err(self, diag: &mut DiagnosticContext) -> Self;
}

impl<T> DiagnosticResult for PackratResult<T>
where
    T: Default,
{
    fn accumulate_err(self, diag: &mut DiagnosticContext) -> Self {
        match self {
            Ok(act) => Ok(act),
            Err(err) => {
                diag.err(err);
                Ok(T::default())
            }
        }
    }
}

impl DiagnosticResult for VisResult {
    fn accumulate_err(self, diag: &mut DiagnosticContext) -> Self {
        match self {
            Ok(act) => Ok(act),
            Err(err) => {
                diag.err(err);
                Ok(Action::Continue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_errors_and_continues() {
        let mut diag = DiagnosticContext::default();
        let res: PackratResult<u32> = Err(Error::misc("first"));
        assert_eq!(res.accumulate_err(&mut diag).unwrap(), 0);
        let act = diag.early_return_err(Error::misc("second")).unwrap();
        assert!(matches!(act, Action::Continue));
        diag.warning(Error::misc("careful"));
        assert!(diag.has_errors());
        assert_eq!(diag.errors_iter().count(), 2);
        assert_eq!(diag.warning_iter().count(), 1);
    }
}
