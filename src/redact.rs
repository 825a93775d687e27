/// Secrets that must never reach the terminal, each with the label printed in
/// its place.
#[derive(Default, Clone)]
pub struct Redactor {
    secrets: Vec<(String, String)>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty secrets are ignored, otherwise every string would be "redacted".
    pub fn hide(&mut self, secret: impl Into<String>, label: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        let label = label.into();
        match self.secrets.iter_mut().find(|(s, _)| *s == secret) {
            Some(entry) => entry.1 = label,
            None => self.secrets.push((secret, label)),
        }
        // longest first so a secret containing another is replaced whole
        self.secrets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, (secret, label)| {
                acc.replace(secret.as_str(), label)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::Redactor;

    #[test]
    fn replaces_every_occurrence() {
        let mut redactor = Redactor::new();
        redactor.hide("s3cr3t", "$GH_TOKEN");
        assert_eq!(
            redactor.redact("token=s3cr3t again s3cr3t"),
            "token=$GH_TOKEN again $GH_TOKEN"
        );
    }

    #[test]
    fn ignores_empty_secret() {
        let mut redactor = Redactor::new();
        redactor.hide("", "$GH_TOKEN");
        assert_eq!(redactor.redact("nothing to hide"), "nothing to hide");
    }

    #[test]
    fn longer_secret_is_replaced_before_its_prefix() {
        let mut redactor = Redactor::new();
        redactor.hide("abc", "$SHORT");
        redactor.hide("abcdef", "$LONG");
        assert_eq!(redactor.redact("x abcdef y abc"), "x $LONG y $SHORT");
    }
}
