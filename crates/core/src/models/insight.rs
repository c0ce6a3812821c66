use serde::{Deserialize, Serialize};

/// Short piece of advice shown next to the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub headline: String,
    pub body: String,
}

impl Insight {
    pub fn new(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            body: body.into(),
        }
    }
}
