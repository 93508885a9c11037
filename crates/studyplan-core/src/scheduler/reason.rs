//! Human-readable explanation attached to each study session.

use std::fmt;

/// Grade weight from which the weight is worth mentioning
const NOTABLE_WEIGHT: f64 = 20.0;

pub(super) struct SessionReason {
    pub days_until_due: Option<i64>,
    pub weight: Option<f64>,
    pub index: u32,
    pub count: u32,
    pub relaxed_spacing: bool,
    pub in_buffer: bool,
}

impl fmt::Display for SessionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();

        match self.days_until_due {
            Some(days) if days <= 1 => parts.push("due tomorrow".into()),
            Some(days) if days <= 3 => parts.push(format!("due in {days} days")),
            _ => {}
        }

        if let Some(weight) = self.weight.filter(|w| *w >= NOTABLE_WEIGHT) {
            parts.push(format!("{weight}% of grade"));
        }

        parts.push(format!("session {}/{}", self.index, self.count));

        if self.count > 1 {
            if self.index == 1 {
                parts.push("first session".into());
            } else if self.index == self.count {
                parts.push("final review".into());
            }
        }

        if self.relaxed_spacing {
            parts.push("spacing relaxed to meet deadline".into());
        }
        if self.in_buffer {
            parts.push("inside deadline buffer".into());
        }

        write!(f, "{}", parts.join(", "))
    }
}
