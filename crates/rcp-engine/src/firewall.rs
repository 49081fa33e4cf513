//! Firewall policy diff.
//!
//! Policies are compared by full structural equality. Anything in the
//! desired set but not the current one is added; anything current but no
//! longer desired is resubmitted with its policy forced to `DELETED`.

use rcp_api::{FirewallAction, FirewallPolicy};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallChangeset {
    pub added: Vec<FirewallPolicy>,
    /// Already rewritten to `DELETED`.
    pub deleted: Vec<FirewallPolicy>,
}

impl FirewallChangeset {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    /// Additions first, then deletions, as one submission.
    pub fn to_submission(&self) -> Vec<FirewallPolicy> {
        self.added.iter().chain(self.deleted.iter()).cloned().collect()
    }
}

fn push_once(out: &mut Vec<FirewallPolicy>, p: FirewallPolicy) {
    if !out.contains(&p) {
        out.push(p);
    }
}

/// Compute the changeset taking `current` to `desired`. Order within each
/// list follows the input order; duplicates collapse.
pub fn diff_policies(current: &[FirewallPolicy], desired: &[FirewallPolicy]) -> FirewallChangeset {
    let mut cs = FirewallChangeset::default();

    for p in desired {
        if !current.contains(p) {
            push_once(&mut cs.added, p.clone());
        }
    }

    for p in current {
        if !desired.contains(p) {
            let mut gone = p.clone();
            gone.policy = FirewallAction::Deleted;
            push_once(&mut cs.deleted, gone);
        }
    }

    cs
}
