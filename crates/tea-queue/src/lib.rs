#![forbid(unsafe_code)]

//! `Queue<R>`: an ordered list of pending request records keyed by a
//! monotonic identifier, plus a driver that folds a per-request handler
//! over the queue under a group-exclusion policy.
//!
//! The driver is the only place in this workspace that threads a *running*
//! piece of fold state (the set of group names already acted on this pass)
//! through a sequence of [`Promise`](tea_promise::Promise) evaluations.

use std::collections::HashSet;

use tea_promise::Promise;
use tea_state::State;

/// An opaque identifier of the form `"{prefix}-{n}"`, assigned once by
/// [`Queue::add`] and never recycled within a queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// The identifier's wire form, e.g. `"search-3"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered sequence of `(RequestId, R)` pairs with a monotone id counter
/// and a string namespace (`prefix`) the ids are drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Queue<R> {
    prefix: String,
    next_id: u64,
    entries: Vec<(RequestId, R)>,
}

impl<R> Queue<R> {
    /// A new empty queue, ids drawn as `"{prefix}-{n}"`.
    pub fn empty(prefix: impl Into<String>) -> Self {
        Queue {
            prefix: prefix.into(),
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Appends `r` under a freshly minted id, then bumps the counter.
    pub fn add(mut self, r: R) -> Self {
        let id = RequestId(format!("{}-{}", self.prefix, self.next_id));
        tracing::trace!(id = %id, "queue add");
        self.next_id += 1;
        self.entries.push((id, r));
        self
    }

    /// Drops the entry matching `id`, preserving the relative order of
    /// everything else. A no-op if `id` is absent.
    pub fn remove(mut self, id: &RequestId) -> Self {
        self.entries.retain(|(entry_id, _)| entry_id != id);
        self
    }

    /// Replaces the payload at `id` in place. A no-op if `id` is absent.
    pub fn insert(mut self, id: &RequestId, r: R) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(entry_id, _)| entry_id == id) {
            entry.1 = r;
        }
        self
    }

    /// The ordered list of `(id, r)` pairs.
    pub fn requests(&self) -> &[(RequestId, R)] {
        &self.entries
    }

    /// True if any entry satisfies `pred`.
    pub fn any(&self, pred: impl Fn(&RequestId, &R) -> bool) -> bool {
        self.entries.iter().any(|(id, r)| pred(id, r))
    }

    /// True if every entry satisfies `pred` (vacuously true for an empty queue).
    pub fn all(&self, pred: impl Fn(&RequestId, &R) -> bool) -> bool {
        self.entries.iter().all(|(id, r)| pred(id, r))
    }
}

/// The decision a [`Queue::run`] handler returns for one entry.
pub enum Group<R, Effect> {
    /// Replace the entry with `r` and emit `effect` unconditionally.
    Send(R, Effect),
    /// If `name` has not yet been marked this pass, emit `effect`, replace
    /// the entry with `r`, and mark `name`. Otherwise, leave the entry
    /// unchanged and emit nothing.
    SendGroup(String, R, Effect),
    /// Mark `name` as acted on this pass (blocking later entries in the
    /// same group) without emitting anything; the entry is unchanged.
    StopGroup(String),
    /// No emission, entry unchanged.
    Skip,
}

/// Adapts a `State` read on a response slot into an unconditional [`Group`]
/// decision: `Empty` sends, `Pending` skips (already in flight), every
/// terminal state (`Stale`/`Done`/`Error`) skips (nothing left to do).
pub fn send<E, A, R, Effect>(
    state: &State<E, A>,
    r: R,
    effect: impl FnOnce() -> Effect,
) -> Group<R, Effect> {
    match state {
        State::Empty => Group::Send(r, effect()),
        _ => Group::Skip,
    }
}

/// As [`send`], but joins a named group: `Empty` emits via `SendGroup`,
/// `Pending` blocks the rest of the group this pass via `StopGroup`, every
/// other state skips.
pub fn with_group<E, A, R, Effect>(
    name: impl Into<String>,
    state: &State<E, A>,
    r: R,
    effect: impl FnOnce() -> Effect,
) -> Group<R, Effect> {
    match state {
        State::Empty => Group::SendGroup(name.into(), r, effect()),
        State::Pending(_) => Group::StopGroup(name.into()),
        State::Stale(_) | State::Done(_) | State::Error(_) => Group::Skip,
    }
}

impl<R> Queue<R>
where
    R: 'static,
{
    /// The driver. Visits every entry exactly once, in order, evaluating
    /// `handler(id, r)` — a promise producing a [`Group`] decision — against
    /// a threaded model and a running set of group names already acted on
    /// this pass. Returns a promise whose `Done` value is the new queue and
    /// the accumulated effect list; effect order matches queue order modulo
    /// group suppression.
    pub fn run<Model, Effect, E>(
        self,
        handler: impl Fn(&RequestId, &R) -> Promise<Model, Effect, E, Group<R, Effect>> + 'static,
    ) -> Promise<Model, Effect, E, (Queue<R>, Vec<Effect>)>
    where
        Model: 'static,
        Effect: Clone + 'static,
        E: 'static,
    {
        Promise::new(move |mut model: Model| {
            let Queue { prefix, next_id, entries } = self;
            let mut acted_groups: HashSet<String> = HashSet::new();
            let mut next_entries = Vec::with_capacity(entries.len());
            let mut all_effects = Vec::new();

            for (id, r) in entries {
                let _span = tracing::debug_span!("queue.dispatch", id = %id).entered();

                let decision_promise = handler(&id, &r);
                let (state, model2, effects) = decision_promise.eval(model);
                model = model2;
                all_effects.extend(effects);

                match state {
                    State::Done(Group::Send(r2, effect)) => {
                        tracing::debug!(id = %id, "queue run: unconditional send");
                        all_effects.push(effect);
                        next_entries.push((id, r2));
                    }
                    State::Done(Group::SendGroup(name, r2, effect)) => {
                        if acted_groups.insert(name.clone()) {
                            tracing::debug!(id = %id, group = %name, "queue run: group send");
                            all_effects.push(effect);
                            next_entries.push((id, r2));
                        } else {
                            tracing::trace!(id = %id, group = %name, "queue run: group already acted, skipping");
                            next_entries.push((id, r));
                        }
                    }
                    State::Done(Group::StopGroup(name)) => {
                        acted_groups.insert(name);
                        next_entries.push((id, r));
                    }
                    State::Done(Group::Skip) => {
                        next_entries.push((id, r));
                    }
                    // A handler that does not resolve to Done this tick makes no
                    // decision; the entry carries over unchanged.
                    _ => {
                        next_entries.push((id, r));
                    }
                }
            }

            let new_queue = Queue {
                prefix,
                next_id,
                entries: next_entries,
            };
            (State::Done((new_queue, all_effects.clone())), model, all_effects)
        })
    }
}
