//! Message template rendering using `{{variable}}` syntax.

use crate::types::Customer;
use std::collections::HashMap;

/// Variables a campaign message may reference.
pub const SUPPORTED_VARIABLES: &[&str] = &["name", "email"];

/// A campaign message template, e.g. `"Hi {{name}}, here's 10% off!"`.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    body: String,
}

impl MessageTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Render with explicit variables in a single left-to-right pass.
    /// Substituted values are never rescanned; unknown placeholders are left untouched.
    pub fn render(&self, variables: &HashMap<&str, String>) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match variables.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }

    /// Render for a single recipient.
    pub fn render_for(&self, customer: &Customer) -> String {
        let mut variables = HashMap::with_capacity(SUPPORTED_VARIABLES.len());
        variables.insert("name", customer.name.clone());
        variables.insert("email", customer.email.clone());
        self.render(&variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_for_customer() {
        let template = MessageTemplate::new("Hi {{name}}, your code was sent to {{email}}. Bye {{name}}!");
        let customer = Customer::new("Amy", "amy@example.com");
        assert_eq!(
            template.render_for(&customer),
            "Hi Amy, your code was sent to amy@example.com. Bye Amy!"
        );
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_kept() {
        let customer = Customer::new("Amy", "amy@example.com");
        assert_eq!(
            MessageTemplate::new("Hello {{nickname}}").render_for(&customer),
            "Hello {{nickname}}"
        );
        assert_eq!(
            MessageTemplate::new("Hi {{name}}, {{oops").render_for(&customer),
            "Hi Amy, {{oops"
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let template = MessageTemplate::new("Hi {{name}} <{{email}}>");
        let customer = Customer::new("{{email}}", "x@example.com");
        for _ in 0..200 {
            assert_eq!(template.render_for(&customer), "Hi {{email}} <x@example.com>");
        }
    }
}
