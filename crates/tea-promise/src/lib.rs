#![forbid(unsafe_code)]

//! `Promise<Model, Effect, E, A>`: a pure, composable description of a
//! computation that reads a `Model`, may update it, may emit a list of
//! `Effect`s, and produces a [`State<E, A>`](tea_state::State).
//!
//! A `Promise` never performs I/O. Evaluating one against a `Model` yields
//! a new `Model`, the effects to hand to the host runtime, and a `State`.
//! It is typically rebuilt from scratch on every message the host's update
//! function processes — see [`Promise::run`]/[`run_with`] for the only
//! entry points a host loop needs.

use std::convert::Infallible;

use tea_state::State;

/// A pure function from a model to `(state, updated model, emitted effects)`.
///
/// Boxed as `dyn FnOnce` rather than `dyn Fn`: a `Promise` is consumed by
/// evaluation exactly once, matching the "rebuilt fresh every tick"
/// lifecycle the host runtime relies on.
pub struct Promise<Model, Effect, E, A> {
    #[allow(clippy::type_complexity)]
    run: Box<dyn FnOnce(Model) -> (State<E, A>, Model, Vec<Effect>)>,
}

impl<Model, Effect, E, A> Promise<Model, Effect, E, A>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
{
    /// Builds a `Promise` directly from its underlying triple-producing
    /// closure. The primitive every other constructor is built from.
    pub fn new(f: impl FnOnce(Model) -> (State<E, A>, Model, Vec<Effect>) + 'static) -> Self {
        Self { run: Box::new(f) }
    }

    /// Evaluates the promise against `model`, consuming it.
    pub fn eval(self, model: Model) -> (State<E, A>, Model, Vec<Effect>) {
        (self.run)(model)
    }

    /// Always yields `Done(a)`, with no effects and no model change.
    pub fn from_value(a: A) -> Self {
        Promise::new(move |model| (State::Done(a), model, Vec::new()))
    }

    /// Always yields `Error(e)`, with no effects and no model change.
    pub fn from_error(e: E) -> Self {
        Promise::new(move |model| (State::Error(e), model, Vec::new()))
    }

    /// Lifts a `Result<A, E>` into a constant `Done`/`Error` promise.
    pub fn from_result(result: Result<A, E>) -> Self {
        Promise::new(move |model| (State::from_result(result), model, Vec::new()))
    }

    /// Lifts a constant `State<E, A>` into a promise.
    pub fn from_state(state: State<E, A>) -> Self {
        Promise::new(move |model| (state, model, Vec::new()))
    }

    /// The classic reader: `f(&model)` produces a promise which is then
    /// evaluated against that same model.
    pub fn from_model(f: impl FnOnce(&Model) -> Promise<Model, Effect, E, A> + 'static) -> Self {
        Promise::new(move |model| {
            let inner = f(&model);
            inner.eval(model)
        })
    }

    /// The cache-insertion primitive: `f(model)` yields `(model', promise)`;
    /// the promise is evaluated against `model'`.
    pub fn from_update(
        f: impl FnOnce(Model) -> (Model, Promise<Model, Effect, E, A>) + 'static,
    ) -> Self {
        Promise::new(move |model| {
            let (model2, inner) = f(model);
            inner.eval(model2)
        })
    }
}

/// The revalidation protocol: inspects a model that *is* a `State<E, A>`
/// slot (reach it with [`Promise::embed_model`]) and decides whether to
/// fire `get_effect`.
///
/// | Slot state | Action | New slot | Returned state | Emits |
/// |---|---|---|---|---|
/// | `Empty` | fire | `Pending(None)` | `Pending(None)` | yes |
/// | `Stale(a)` | fire, keep `a` | `Pending(Some a)` | `Pending(Some a)` | yes |
/// | `Pending(p)` | wait | `Pending(p)` | `Pending(p)` | no |
/// | `Done(a)` | serve | `Done(a)` | `Done(a)` | no |
/// | `Error(e)` | surface | `Error(e)` | `Error(e)` | no |
///
/// Once the slot is `Pending`, re-evaluating this promise against the same
/// model emits no effect: the only way out of `Pending` is for the host to
/// write a terminal state into the slot before the next tick.
pub fn from_effect_when_empty<E, A, Effect>(
    get_effect: impl FnOnce() -> Effect + 'static,
) -> Promise<State<E, A>, Effect, E, A>
where
    E: Clone + 'static,
    A: Clone + 'static,
    Effect: 'static,
{
    Promise::new(move |slot: State<E, A>| match slot {
        State::Empty => {
            let effect = get_effect();
            tracing::trace!(slot = "empty", "firing revalidation effect");
            let next = State::Pending(None);
            (next.clone(), next, vec![effect])
        }
        State::Stale(a) => {
            let effect = get_effect();
            tracing::trace!(slot = "stale", "firing revalidation effect, keeping previous value");
            let next = State::Pending(Some(a));
            (next.clone(), next, vec![effect])
        }
        State::Pending(previous) => {
            tracing::trace!(slot = "pending", "already in flight, no effect emitted");
            let next = State::Pending(previous);
            (next.clone(), next, Vec::new())
        }
        State::Done(a) => {
            let next = State::Done(a);
            (next.clone(), next, Vec::new())
        }
        State::Error(e) => {
            let next = State::Error(e);
            (next.clone(), next, Vec::new())
        }
    })
}

impl<Model, Effect, E, A> Promise<Model, Effect, E, A>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
{
    /// Lifts `f` under every state variant's payload.
    pub fn map<B: 'static>(self, f: impl FnOnce(A) -> B + 'static) -> Promise<Model, Effect, E, B> {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            (state.map(f), model2, effects)
        })
    }

    /// Applies `g` to every effect in the emitted list.
    pub fn map_effect<NewEffect: 'static>(
        self,
        g: impl Fn(Effect) -> NewEffect + 'static,
    ) -> Promise<Model, NewEffect, E, A> {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            let effects = effects.into_iter().map(g).collect();
            (state, model2, effects)
        })
    }

    /// Applies `g` only to the `Error` payload.
    pub fn map_error<F: 'static>(self, g: impl FnOnce(E) -> F + 'static) -> Promise<Model, Effect, F, A> {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            (state.map_err(g), model2, effects)
        })
    }

    /// Reifies the inner `State` as the `Done` value of a new promise:
    /// `Done(inner)` if `inner` was not `Pending`, `Pending(Some(inner))`
    /// otherwise. Lets a caller inspect a slot without blocking on it.
    pub fn with_state(self) -> Promise<Model, Effect, Infallible, State<E, A>> {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            let outer = if state.is_pending() {
                State::Pending(Some(state))
            } else {
                State::Done(state)
            };
            (outer, model2, effects)
        })
    }

    /// Monadic bind. `Pending(Some a)`/`Stale(a)`/`Done(a)` continue with
    /// `f(a)`; if the source was `Pending(Some a)`, the continuation's
    /// state is forced back to `Pending` (preserving the "still loading"
    /// signal through the chain). `Empty`/`Pending(None)` short-circuit to
    /// themselves; `Error` short-circuits to `Error`. Effects concatenate.
    pub fn and_then<B: 'static>(
        self,
        f: impl FnOnce(A) -> Promise<Model, Effect, E, B> + 'static,
    ) -> Promise<Model, Effect, E, B> {
        Promise::new(move |model| {
            let (state, model2, mut effects) = self.eval(model);
            match state {
                State::Empty => (State::Empty, model2, effects),
                State::Pending(None) => (State::Pending(None), model2, effects),
                State::Pending(Some(a)) => {
                    let (state2, model3, more) = f(a).eval(model2);
                    effects.extend(more);
                    (state2.set_pending(), model3, effects)
                }
                State::Stale(a) | State::Done(a) => {
                    let (state2, model3, more) = f(a).eval(model2);
                    effects.extend(more);
                    (state2, model3, effects)
                }
                State::Error(e) => (State::Error(e), model2, effects),
            }
        })
    }

    /// If the state is `Pending(None)`, replaces it with `Pending(Some(a))`;
    /// otherwise leaves it unchanged.
    pub fn when_pending(self, fallback: A) -> Self {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            let state = match state {
                State::Pending(None) => State::Pending(Some(fallback)),
                other => other,
            };
            (state, model2, effects)
        })
    }

    /// If the state is `Error(e)`, replaces it with `Done(f(e))`; otherwise
    /// leaves it unchanged. Widens the error type to [`Infallible`] since
    /// every error has now been handled.
    pub fn when_error(self, f: impl FnOnce(E) -> A + 'static) -> Promise<Model, Effect, Infallible, A> {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            let state = match state {
                State::Empty => State::Empty,
                State::Pending(prev) => State::Pending(prev),
                State::Stale(a) => State::Stale(a),
                State::Done(a) => State::Done(a),
                State::Error(e) => State::Done(f(e)),
            };
            (state, model2, effects)
        })
    }

    /// Convenience wrapper over [`Promise::when_pending`]: applies the
    /// fallback only when one is supplied, a no-op for `None`.
    pub fn with_maybe(self, fallback: Option<A>) -> Self {
        match fallback {
            Some(a) => self.when_pending(a),
            None => self,
        }
    }

    /// Convenience wrapper over [`Promise::when_pending`] for a `Result`
    /// fallback: `Ok(a)` behaves like [`Promise::with_maybe`]'s `Some(a)`,
    /// `Err(_)` leaves the promise unchanged.
    pub fn with_result(self, fallback: Result<A, E>) -> Self {
        match fallback {
            Ok(a) => self.when_pending(a),
            Err(_) => self,
        }
    }

    /// For errors matching `pred`, treats the failure as non-fatal: `Some(a)`
    /// recovers to `Done(a)`, `None` resets the slot to `Empty` so the next
    /// revalidation retries. Errors failing `pred`, and every other state,
    /// pass through unchanged.
    pub fn with_maybe_when_error(
        self,
        pred: impl FnOnce(&E) -> bool + 'static,
        fallback: Option<A>,
    ) -> Self {
        Promise::new(move |model| {
            let (state, model2, effects) = self.eval(model);
            let state = match state {
                State::Error(e) if pred(&e) => match fallback {
                    Some(a) => State::Done(a),
                    None => State::Empty,
                },
                other => other,
            };
            (state, model2, effects)
        })
    }

    /// On `Error(e)`, evaluates `handler(e)` against the updated model and
    /// appends its effects; every other state passes through unchanged.
    /// The only construct that swaps an `Error` for a fresh promise.
    pub fn recover<E2: 'static>(
        self,
        handler: impl FnOnce(E) -> Promise<Model, Effect, E2, A> + 'static,
    ) -> Promise<Model, Effect, E2, A> {
        Promise::new(move |model| {
            let (state, model2, mut effects) = self.eval(model);
            match state {
                State::Error(e) => {
                    let (state2, model3, more) = handler(e).eval(model2);
                    effects.extend(more);
                    (state2, model3, effects)
                }
                State::Empty => (State::Empty, model2, effects),
                State::Pending(prev) => (State::Pending(prev), model2, effects),
                State::Stale(a) => (State::Stale(a), model2, effects),
                State::Done(a) => (State::Done(a), model2, effects),
            }
        })
    }

    /// Evaluates `self`, then calls `writer(state, model)` to obtain a
    /// further model/effect pair, appending both. The result state is
    /// always `Done(())`, the only shape [`run`]/[`run_with`] accept.
    pub fn update(
        self,
        writer: impl FnOnce(State<E, A>, Model) -> (Model, Vec<Effect>) + 'static,
    ) -> Promise<Model, Effect, Infallible, ()> {
        Promise::new(move |model| {
            let (state, model2, mut effects) = self.eval(model);
            let (model3, more) = writer(state, model2);
            effects.extend(more);
            (State::Done(()), model3, effects)
        })
    }

    /// Evaluates `self` against `get(outer)` and writes the result back via
    /// `set(inner, outer)`. State and effects pass through verbatim. The
    /// only mechanism for composing promises over a larger model.
    pub fn embed_model<Outer: 'static>(self, lens: Lens<Outer, Model>) -> Promise<Outer, Effect, E, A> {
        Promise::new(move |outer: Outer| {
            let inner = (lens.get)(&outer);
            let (state, inner2, effects) = self.eval(inner);
            let outer2 = (lens.set)(inner2, outer);
            (state, outer2, effects)
        })
    }
}

impl<Model, Effect, E, F> Promise<Model, Effect, E, F>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    F: 'static,
{
    /// The applicative product. Evaluates `self` (a promise of a function)
    /// then `pa` against the resulting model — model threading is strict
    /// left-to-right — and combines their states with
    /// [`tea_state::and_map`], concatenating effects in evaluation order.
    pub fn and_map<A, B>(self, pa: Promise<Model, Effect, E, A>) -> Promise<Model, Effect, E, B>
    where
        F: FnOnce(A) -> B,
        A: 'static,
        B: 'static,
    {
        Promise::new(move |model| {
            let (sf, model2, mut effects) = self.eval(model);
            let (sa, model3, more) = pa.eval(model2);
            effects.extend(more);
            (tea_state::and_map(sf, sa), model3, effects)
        })
    }
}

/// A getter/setter pair focusing a larger `Outer` model onto an `Inner`
/// slice, used by [`Promise::embed_model`]. Compose lenses by function
/// composition rather than inheritance.
pub struct Lens<Outer, Inner> {
    #[allow(clippy::type_complexity)]
    get: Box<dyn Fn(&Outer) -> Inner>,
    #[allow(clippy::type_complexity)]
    set: Box<dyn Fn(Inner, Outer) -> Outer>,
}

impl<Outer, Inner> Lens<Outer, Inner> {
    /// Builds a lens from a getter (clones the focused slice out of the
    /// whole) and a setter (writes the slice back, producing a new whole).
    pub fn new(
        get: impl Fn(&Outer) -> Inner + 'static,
        set: impl Fn(Inner, Outer) -> Outer + 'static,
    ) -> Self {
        Self {
            get: Box::new(get),
            set: Box::new(set),
        }
    }
}

/// Combines two promises with a binary function, via
/// `fromValue(f) |> andMap(pa) |> andMap(pb)`.
pub fn map2<Model, Effect, E, A, B, C>(
    f: impl FnOnce(A, B) -> C + 'static,
    pa: Promise<Model, Effect, E, A>,
    pb: Promise<Model, Effect, E, B>,
) -> Promise<Model, Effect, E, C>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
{
    let pf = Promise::from_value(move |a: A| move |b: B| f(a, b));
    pf.and_map(pa).and_map(pb)
}

/// Combines three promises with a ternary function.
pub fn map3<Model, Effect, E, A, B, C, D>(
    f: impl FnOnce(A, B, C) -> D + 'static,
    pa: Promise<Model, Effect, E, A>,
    pb: Promise<Model, Effect, E, B>,
    pc: Promise<Model, Effect, E, C>,
) -> Promise<Model, Effect, E, D>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
    D: 'static,
{
    let pf = Promise::from_value(move |a: A| move |b: B| move |c: C| f(a, b, c));
    pf.and_map(pa).and_map(pb).and_map(pc)
}

/// Combines four promises with a quaternary function.
#[allow(clippy::too_many_arguments)]
pub fn map4<Model, Effect, E, A, B, C, D, Out>(
    f: impl FnOnce(A, B, C, D) -> Out + 'static,
    pa: Promise<Model, Effect, E, A>,
    pb: Promise<Model, Effect, E, B>,
    pc: Promise<Model, Effect, E, C>,
    pd: Promise<Model, Effect, E, D>,
) -> Promise<Model, Effect, E, Out>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
    D: 'static,
    Out: 'static,
{
    let pf = Promise::from_value(move |a: A| move |b: B| move |c: C| move |d: D| f(a, b, c, d));
    pf.and_map(pa).and_map(pb).and_map(pc).and_map(pd)
}

/// Folds a homogeneous list of promises into one producing a `Vec`, via
/// repeated [`map2`]. A single `Pending`/`Error` among the list propagates
/// per the applicative table.
pub fn combine<Model, Effect, E, A>(
    promises: Vec<Promise<Model, Effect, E, A>>,
) -> Promise<Model, Effect, E, Vec<A>>
where
    Model: 'static,
    Effect: 'static,
    E: 'static,
    A: 'static,
{
    promises.into_iter().fold(Promise::from_value(Vec::new()), |acc, p| {
        map2(
            |mut v: Vec<A>, a: A| {
                v.push(a);
                v
            },
            acc,
            p,
        )
    })
}

/// Evaluates a sinked promise (result type `()`, error type [`Infallible`])
/// and returns `(model', effects)`. One of the only two public entry points
/// a host update loop needs.
pub fn run<Model, Effect>(p: Promise<Model, Effect, Infallible, ()>, model: Model) -> (Model, Vec<Effect>)
where
    Model: 'static,
    Effect: 'static,
{
    let (_state, model2, effects) = p.eval(model);
    tracing::debug!(effect_count = effects.len(), "promise run produced effects");
    (model2, effects)
}

/// [`run`] with its arguments swapped, for call sites that prefer to thread
/// the model first.
pub fn run_with<Model, Effect>(model: Model, p: Promise<Model, Effect, Infallible, ()>) -> (Model, Vec<Effect>)
where
    Model: 'static,
    Effect: 'static,
{
    run(p, model)
}
