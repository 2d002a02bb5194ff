use std::fmt;

/// Portal login. Lives for a single login + search cycle.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn debug_redacts_secret() {
        let credentials = Credentials {
            identifier: "98765".to_string(),
            secret: "hunter2".to_string(),
        };
        let printed = format!("{:?}", credentials);

        assert!(printed.contains("98765"));
        assert!(!printed.contains("hunter2"));
    }
}
