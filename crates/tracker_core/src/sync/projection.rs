//! Client-side copy of the sheet, advanced only by confirmed outcomes.
//!
//! # Responsibility
//! - Track each issued mutation as a ticket: pending, confirmed or failed.
//! - Fold a confirmed `MutationOutcome` into the local tree by id path.
//!
//! # Invariants
//! - Nothing is applied optimistically; `begin` never touches the tree.
//! - A fold is all-or-nothing. An outcome whose id path does not resolve
//!   leaves the tree unchanged and raises `needs_refetch`.
//! - Siblings move only as far as the outcome says: adds append or replace
//!   in place, deletes splice and renumber, full-sheet outcomes replace.

use crate::model::sheet::Sheet;
use crate::order::siblings::{position_of, remove_by_id, Ordered};
use crate::service::mutation::{MutationOutcome, SheetMutation};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Handle for one issued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationTicket(u64);

impl MutationTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for MutationTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Confirmed,
    /// Remote side rejected the mutation with this message.
    Failed(String),
}

impl MutationState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// No sheet has been loaded yet.
    NotLoaded,
    UnknownTicket(MutationTicket),
    /// Ticket was already confirmed or failed.
    AlreadySettled(MutationTicket),
    /// Outcome kind does not answer the ticket's request.
    OutcomeMismatch {
        ticket: MutationTicket,
        op: &'static str,
    },
    /// Outcome refers to a node the local tree does not have.
    StalePath { path: String },
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "no sheet loaded"),
            Self::UnknownTicket(ticket) => write!(f, "unknown mutation ticket {ticket}"),
            Self::AlreadySettled(ticket) => write!(f, "mutation ticket {ticket} already settled"),
            Self::OutcomeMismatch { ticket, op } => {
                write!(f, "outcome does not answer `{op}` for ticket {ticket}")
            }
            Self::StalePath { path } => write!(f, "local tree has no node at `{path}`"),
        }
    }
}

impl Error for ProjectionError {}

#[derive(Debug, Clone)]
struct TicketEntry {
    mutation: SheetMutation,
    state: MutationState,
}

/// Locally held, eventually consistent copy of one sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetProjection {
    sheet: Option<Sheet>,
    tickets: BTreeMap<MutationTicket, TicketEntry>,
    next_ticket: u64,
    needs_refetch: bool,
}

impl SheetProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly fetched sheet and clears the refetch flag.
    pub fn load(&mut self, sheet: Sheet) {
        self.sheet = Some(sheet);
        self.needs_refetch = false;
    }

    pub fn sheet(&self) -> Option<&Sheet> {
        self.sheet.as_ref()
    }

    /// True after an outcome could not be folded; cleared by `load` or by
    /// any full-sheet outcome.
    pub fn needs_refetch(&self) -> bool {
        self.needs_refetch
    }

    /// Records `mutation` as pending. The local tree is not changed.
    pub fn begin(&mut self, mutation: SheetMutation) -> MutationTicket {
        self.next_ticket += 1;
        let ticket = MutationTicket(self.next_ticket);
        self.tickets.insert(
            ticket,
            TicketEntry {
                mutation,
                state: MutationState::Pending,
            },
        );
        ticket
    }

    pub fn state(&self, ticket: MutationTicket) -> Option<&MutationState> {
        self.tickets.get(&ticket).map(|entry| &entry.state)
    }

    /// Pending mutations in issue order.
    pub fn pending(&self) -> impl Iterator<Item = (MutationTicket, &SheetMutation)> {
        self.tickets
            .iter()
            .filter(|(_, entry)| entry.state == MutationState::Pending)
            .map(|(ticket, entry)| (*ticket, &entry.mutation))
    }

    /// Folds a server-confirmed outcome into the local tree.
    ///
    /// The ticket is marked confirmed once the outcome is accepted, even if
    /// the fold itself fails with `StalePath`; the remote side did apply it.
    ///
    /// # Errors
    /// - `UnknownTicket` / `AlreadySettled` for bad tickets.
    /// - `OutcomeMismatch` when the outcome answers a different request.
    ///   The ticket stays pending.
    /// - `NotLoaded` / `StalePath` when the local tree cannot take the
    ///   outcome. The tree is unchanged and `needs_refetch` is raised.
    pub fn confirm(
        &mut self,
        ticket: MutationTicket,
        outcome: MutationOutcome,
    ) -> Result<&Sheet, ProjectionError> {
        let entry = self.pending_entry(ticket)?;
        if !entry.mutation.accepts(&outcome) {
            return Err(ProjectionError::OutcomeMismatch {
                ticket,
                op: entry.mutation.name(),
            });
        }
        let op = entry.mutation.name();
        entry.state = MutationState::Confirmed;

        let folded = match (&self.sheet, outcome) {
            (_, MutationOutcome::SheetReplaced(sheet) | MutationOutcome::Reordered(sheet)) => {
                self.needs_refetch = false;
                Ok(sheet)
            }
            (None, _) => Err(ProjectionError::NotLoaded),
            (Some(current), outcome) => {
                let mut next = current.clone();
                fold(&mut next, outcome).map(|()| next)
            }
        };

        match folded {
            Ok(next) => {
                info!("event=projection_confirm module=sync status=ok ticket={ticket} op={op}");
                Ok(self.sheet.insert(next))
            }
            Err(err) => {
                self.needs_refetch = true;
                warn!(
                    "event=projection_confirm module=sync status=error ticket={ticket} op={op} error={err}"
                );
                Err(err)
            }
        }
    }

    /// Marks a mutation as rejected remotely. The local tree is unchanged.
    pub fn fail(
        &mut self,
        ticket: MutationTicket,
        message: impl Into<String>,
    ) -> Result<(), ProjectionError> {
        let entry = self.pending_entry(ticket)?;
        let op = entry.mutation.name();
        entry.state = MutationState::Failed(message.into());
        warn!("event=projection_fail module=sync status=ok ticket={ticket} op={op}");
        Ok(())
    }

    /// Drops settled tickets and returns how many were removed.
    pub fn prune_settled(&mut self) -> usize {
        let before = self.tickets.len();
        self.tickets.retain(|_, entry| !entry.state.is_settled());
        before - self.tickets.len()
    }

    fn pending_entry(&mut self, ticket: MutationTicket) -> Result<&mut TicketEntry, ProjectionError> {
        let entry = self
            .tickets
            .get_mut(&ticket)
            .ok_or(ProjectionError::UnknownTicket(ticket))?;
        if entry.state.is_settled() {
            return Err(ProjectionError::AlreadySettled(ticket));
        }
        Ok(entry)
    }
}

/// Applies one node-level outcome to `sheet` in place.
///
/// On error `sheet` may be partially changed; callers fold into a copy.
pub fn fold(sheet: &mut Sheet, outcome: MutationOutcome) -> Result<(), ProjectionError> {
    match outcome {
        MutationOutcome::SheetReplaced(next) | MutationOutcome::Reordered(next) => {
            *sheet = next;
        }
        MutationOutcome::TopicAdded(topic) => upsert(&mut sheet.topics, topic),
        MutationOutcome::TopicRenamed(topic) => {
            let path = topic.id.clone();
            replace_in_place(&mut sheet.topics, topic, path)?;
        }
        MutationOutcome::TopicDeleted { topic_id } => {
            remove_by_id(&mut sheet.topics, &topic_id).map_err(|_| stale(&[topic_id.as_str()]))?;
        }
        MutationOutcome::SubTopicAdded {
            topic_id,
            sub_topic,
        } => {
            let topic = sheet
                .topic_mut(&topic_id)
                .ok_or_else(|| stale(&[topic_id.as_str()]))?;
            upsert(&mut topic.sub_topics, sub_topic);
        }
        MutationOutcome::SubTopicRenamed {
            topic_id,
            sub_topic,
        } => {
            let path = path_of(&[topic_id.as_str(), sub_topic.id.as_str()]);
            let topic = sheet
                .topic_mut(&topic_id)
                .ok_or_else(|| stale(&[topic_id.as_str()]))?;
            replace_in_place(&mut topic.sub_topics, sub_topic, path)?;
        }
        MutationOutcome::SubTopicDeleted {
            topic_id,
            subtopic_id,
        } => {
            let topic = sheet
                .topic_mut(&topic_id)
                .ok_or_else(|| stale(&[topic_id.as_str()]))?;
            remove_by_id(&mut topic.sub_topics, &subtopic_id)
                .map_err(|_| stale(&[topic_id.as_str(), subtopic_id.as_str()]))?;
        }
        MutationOutcome::QuestionAdded {
            topic_id,
            subtopic_id,
            question,
        } => {
            let sub_topic = sheet
                .topic_mut(&topic_id)
                .and_then(|topic| topic.sub_topic_mut(&subtopic_id))
                .ok_or_else(|| stale(&[topic_id.as_str(), subtopic_id.as_str()]))?;
            upsert(&mut sub_topic.questions, question);
        }
        MutationOutcome::QuestionUpdated {
            topic_id,
            subtopic_id,
            question,
        } => {
            let path = path_of(&[topic_id.as_str(), subtopic_id.as_str(), question.id.as_str()]);
            let sub_topic = sheet
                .topic_mut(&topic_id)
                .and_then(|topic| topic.sub_topic_mut(&subtopic_id))
                .ok_or_else(|| stale(&[topic_id.as_str(), subtopic_id.as_str()]))?;
            replace_in_place(&mut sub_topic.questions, question, path)?;
        }
        MutationOutcome::QuestionDeleted {
            topic_id,
            subtopic_id,
            question_id,
        } => {
            let sub_topic = sheet
                .topic_mut(&topic_id)
                .and_then(|topic| topic.sub_topic_mut(&subtopic_id))
                .ok_or_else(|| stale(&[topic_id.as_str(), subtopic_id.as_str()]))?;
            remove_by_id(&mut sub_topic.questions, &question_id)
                .map_err(|_| stale(&[topic_id.as_str(), subtopic_id.as_str(), question_id.as_str()]))?;
        }
    }
    Ok(())
}

/// Replaces a same-id sibling in place, or appends as the server did.
fn upsert<T: Ordered>(siblings: &mut Vec<T>, node: T) {
    match position_of(siblings, node.id()) {
        Some(index) => siblings[index] = node,
        None => siblings.push(node),
    }
}

fn replace_in_place<T: Ordered>(
    siblings: &mut [T],
    node: T,
    path: String,
) -> Result<(), ProjectionError> {
    let index = position_of(siblings, node.id()).ok_or(ProjectionError::StalePath { path })?;
    siblings[index] = node;
    Ok(())
}

fn path_of(segments: &[&str]) -> String {
    segments.join("/")
}

fn stale(segments: &[&str]) -> ProjectionError {
    ProjectionError::StalePath {
        path: path_of(segments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sheet::Topic;

    fn loaded() -> SheetProjection {
        let mut sheet = Sheet::with_id("sheet-1", "Sheet", "sheet").unwrap();
        let mut topic = Topic::with_id("t-1", "Arrays").unwrap();
        topic.order = 0;
        sheet.topics.push(topic);
        let mut projection = SheetProjection::new();
        projection.load(sheet);
        projection
    }

    #[test]
    fn begin_does_not_touch_the_tree() {
        let mut projection = loaded();
        let before = projection.sheet().cloned();
        let ticket = projection.begin(SheetMutation::DeleteTopic {
            topic_id: "t-1".to_string(),
        });

        assert_eq!(projection.sheet().cloned(), before);
        assert_eq!(projection.state(ticket), Some(&MutationState::Pending));
        assert_eq!(projection.pending().count(), 1);
    }

    #[test]
    fn settled_ticket_cannot_be_settled_again() {
        let mut projection = loaded();
        let ticket = projection.begin(SheetMutation::DeleteTopic {
            topic_id: "t-1".to_string(),
        });
        projection.fail(ticket, "Topic not found").unwrap();

        assert_eq!(
            projection.fail(ticket, "again").unwrap_err(),
            ProjectionError::AlreadySettled(ticket)
        );
        assert_eq!(projection.prune_settled(), 1);
        assert_eq!(projection.state(ticket), None);
    }

    #[test]
    fn upsert_replaces_existing_id_without_moving_it() {
        let mut topics = vec![
            Topic::with_id("a", "A").unwrap(),
            Topic::with_id("b", "B").unwrap(),
        ];
        upsert(&mut topics, Topic::with_id("a", "A2").unwrap());
        let titles: Vec<_> = topics.iter().map(|topic| topic.title.as_str()).collect();
        assert_eq!(titles, vec!["A2", "B"]);
    }
}
