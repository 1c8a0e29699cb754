use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use anyhow::Context;
use derive_new::new;

pub const REF_PREFIX: &str = "refs/heads/";

/// Full name of a reference, relative to the git directory
///
/// Either `HEAD` (detached) or a path such as `refs/heads/main`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    /// The branch this reference names, if it is a branch reference
    pub fn branch_name(&self) -> Option<BranchName> {
        self.0
            .strip_prefix(REF_PREFIX)
            .and_then(|name| BranchName::try_parse(name.to_string()).ok())
    }
}

impl AsRef<str> for SymRefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("branch name cannot be empty");
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid branch name: {}", name);
        } else {
            Ok(Self(name))
        }
    }

    pub fn to_sym_ref_name(&self) -> SymRefName {
        SymRefName::new(format!("{REF_PREFIX}{}", self.0))
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    proptest! {
        #[test]
        fn valid_branch_names_parse(branch_name in "[a-zA-Z0-9_-]+") {
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn hierarchical_branch_names_parse(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}/{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn names_starting_with_dot_are_rejected(suffix in "[a-zA-Z0-9_-]+") {
            assert!(BranchName::try_parse(format!(".{}", suffix)).is_err());
        }

        #[test]
        fn names_ending_with_lock_are_rejected(prefix in "[a-zA-Z0-9_-]+") {
            assert!(BranchName::try_parse(format!("{}.lock", prefix)).is_err());
        }

        #[test]
        fn names_with_special_chars_are_rejected(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~]"
        ) {
            let branch_name = format!("{}{}{}", prefix, special_char, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(BranchName::try_parse("".to_string()).is_err());
    }

    #[test]
    fn converts_between_branch_and_ref_names() {
        let branch = BranchName::try_parse("feature/x".into()).unwrap();

        assert_eq!(branch.as_ref(), "feature/x");
        assert_eq!(branch.to_sym_ref_name().as_ref_path(), "refs/heads/feature/x");
        assert_eq!(branch.to_sym_ref_name().branch_name(), Some(branch));
    }

    #[test]
    fn head_is_not_a_branch() {
        let head = SymRefName::new("HEAD".to_string());

        assert_eq!(head.branch_name(), None);
    }
}
