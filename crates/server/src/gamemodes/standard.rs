use super::GameMode;

/// Plain rules, no side effects.
pub struct Standard;

impl GameMode for Standard {
    fn name(&self) -> &'static str {
        "Standard"
    }
}
