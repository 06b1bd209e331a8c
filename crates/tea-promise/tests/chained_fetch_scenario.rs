//! The "chained fetch" scenario from the specification: a search term is
//! upper-cased through a cached fetch, and the upper-cased result feeds a
//! second, independently-cached suggestion fetch.

use std::collections::HashMap;

use tea_promise::{from_effect_when_empty, Lens, Promise};
use tea_state::State;

#[derive(Clone, Debug, Default)]
struct Model {
    search_term: String,
    upper: HashMap<String, State<String, String>>,
    suggest: HashMap<String, State<String, String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Effect {
    UpperRequest(String),
    SuggestRequest(String),
}

fn upper_promise(term: &str) -> Promise<Model, Effect, String, String> {
    let key = term.to_string();
    let key_for_get = key.clone();
    let key_for_set = key.clone();
    let lens: Lens<Model, State<String, String>> = Lens::new(
        move |m: &Model| m.upper.get(&key_for_get).cloned().unwrap_or(State::Empty),
        move |inner, mut m: Model| {
            m.upper.insert(key_for_set.clone(), inner);
            m
        },
    );
    let effect_key = key.clone();
    from_effect_when_empty::<String, String, Effect>(move || Effect::UpperRequest(effect_key))
        .embed_model(lens)
}

fn suggest_promise(upper: &str) -> Promise<Model, Effect, String, String> {
    let key = upper.to_string();
    let key_for_get = key.clone();
    let key_for_set = key.clone();
    let lens: Lens<Model, State<String, String>> = Lens::new(
        move |m: &Model| m.suggest.get(&key_for_get).cloned().unwrap_or(State::Empty),
        move |inner, mut m: Model| {
            m.suggest.insert(key_for_set.clone(), inner);
            m
        },
    );
    let effect_key = key.clone();
    from_effect_when_empty::<String, String, Effect>(move || Effect::SuggestRequest(effect_key))
        .embed_model(lens)
}

#[test]
fn upper_done_then_suggest_empty_fires_exactly_one_effect() {
    let mut model = Model {
        search_term: "cat".to_string(),
        ..Default::default()
    };
    model.upper.insert("cat".to_string(), State::Done("CAT".to_string()));
    model.suggest.insert("CAT".to_string(), State::Empty);

    let program = upper_promise(&model.search_term.clone())
        .and_then(|upper| suggest_promise(&upper));
    let (state, model2, effects) = program.eval(model);

    assert_eq!(state, State::Pending(None));
    assert_eq!(effects, vec![Effect::SuggestRequest("CAT".to_string())]);
    assert_eq!(model2.suggest.get("CAT"), Some(&State::Pending(None)));
    // The already-Done upper slot is untouched by the chain.
    assert_eq!(model2.upper.get("cat"), Some(&State::Done("CAT".to_string())));
}

#[test]
fn upper_still_pending_blocks_the_chain_without_firing_suggest() {
    let mut model = Model::default();
    model.upper.insert("cat".to_string(), State::Pending(None));

    let program = upper_promise("cat").and_then(|upper| suggest_promise(&upper));
    let (state, model2, effects) = program.eval(model);

    assert_eq!(state, State::Pending(None));
    assert!(effects.is_empty());
    assert!(model2.suggest.is_empty());
}
