use crate::item::ItemRef;
use crate::node::NodePath;
use crate::station::{StationId, StationKind};

/// Context handed to an acceptance policy: the station and the candidate
/// parent position a drop would land under.
#[derive(Clone, Debug)]
pub struct ParentContext<'a> {
    pub station: StationId,
    pub kind: StationKind,
    pub working_area: Option<&'a str>,
    /// Candidate parent node; the empty path is the station root.
    pub path: NodePath,
}

/// Pluggable predicate evaluated before any structural mutation. The
/// ordered form is consulted when a drop would reorder among siblings
/// (e.g. within a tabbed group); it defaults to the plain form.
pub trait Acceptance {
    fn accept(&self, parent: &ParentContext<'_>, child: &ItemRef) -> bool;

    fn accept_ordered(
        &self,
        parent: &ParentContext<'_>,
        child: &ItemRef,
        _next_sibling: Option<&ItemRef>,
    ) -> bool {
        self.accept(parent, child)
    }
}

/// Accepts everything except an item that would nest the station inside
/// itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAcceptance;

impl Acceptance for DefaultAcceptance {
    fn accept(&self, parent: &ParentContext<'_>, child: &ItemRef) -> bool {
        !child.embeds.contains(&parent.station)
    }
}

/// Rejects drops whose item declares a working area different from the
/// candidate parent's. Items without a declared working area go anywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkingAreaAcceptance;

impl Acceptance for WorkingAreaAcceptance {
    fn accept(&self, parent: &ParentContext<'_>, child: &ItemRef) -> bool {
        match child.working_area.as_deref() {
            None => true,
            Some(area) => parent.working_area == Some(area),
        }
    }
}

/// Logical AND over any number of policies. Empty accepts everything.
#[derive(Default)]
pub struct MultiAcceptance {
    policies: Vec<Box<dyn Acceptance>>,
}

impl MultiAcceptance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, policy: Box<dyn Acceptance>) {
        self.policies.push(policy);
    }

    pub fn with(mut self, policy: Box<dyn Acceptance>) -> Self {
        self.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Acceptance for MultiAcceptance {
    fn accept(&self, parent: &ParentContext<'_>, child: &ItemRef) -> bool {
        self.policies.iter().all(|p| p.accept(parent, child))
    }

    fn accept_ordered(
        &self,
        parent: &ParentContext<'_>,
        child: &ItemRef,
        next_sibling: Option<&ItemRef>,
    ) -> bool {
        self.policies
            .iter()
            .all(|p| p.accept_ordered(parent, child, next_sibling))
    }
}
