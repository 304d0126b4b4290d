/// Asks the user a yes/no question.
pub trait Confirm {
    /// Returns `true` only on an explicit affirmative answer.
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}
