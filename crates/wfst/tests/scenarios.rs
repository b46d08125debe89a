//! End-to-end scenarios through the public API.
//!
//! Each test builds small automata by hand or from strings, runs them through
//! one or more operations, and checks the observable result: strings read
//! back, arc labels and weights, or files written and read again.

use wfst::algorithms::{
    ProjectType, RmEpsilonConfig, ShortestPathConfig, add_labels, add_string, add_translation,
    add_wstring, closure_star, convert_symbols, equal, get_output_string, get_string, project,
    project_output, rm_epsilon, shortest_path, verify, wget_string,
};
use wfst::{
    Arc, ComposeDriver, ComposeFst, ComposeOptions, ExpandedFst, Fst, FstError, KDELTA, Label,
    MatchType, MatcherConfig, MutableFst, Semiring, SharedSymbols, SpecialMatch, StdVectorFst,
    SymbolTable, TropicalWeight, compose, compose_with_options,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bytes(s: &str) -> Vec<Label> {
    s.bytes().map(Label::from).collect()
}

/// Sum of arc weights plus the final weight along a linear automaton.
fn path_weight(fst: &StdVectorFst) -> f32 {
    let mut state = fst.start().expect("start state");
    let mut total = 0.0;
    loop {
        let arcs = fst.arcs(state).expect("arcs");
        match arcs {
            [] => break,
            [arc] => {
                total += arc.weight.value();
                state = arc.nextstate;
            }
            _ => panic!("state {state} branches"),
        }
    }
    total + fst.final_weight(state).expect("state").expect("final").value()
}

// ---------------------------------------------------------------------------
// Construction and strings
// ---------------------------------------------------------------------------

#[test]
fn add_string_twice_builds_a_union() {
    init_logging();
    let mut fst = StdVectorFst::new();
    add_string(&mut fst, "hello").unwrap();
    add_string(&mut fst, "world").unwrap();
    assert_eq!(fst.num_states(), 11);
    assert_eq!(fst.num_arcs(0).unwrap(), 2);
    verify(&fst).unwrap();

    let both = shortest_path(&fst, 2).unwrap();
    assert_eq!(both.num_arcs(0).unwrap(), 2);
}

#[test]
fn byte_and_wide_strings() {
    let mut fst = StdVectorFst::new();
    add_string(&mut fst, "hello").unwrap();
    assert_eq!(get_string(&fst).unwrap(), "hello");

    let mut wide = StdVectorFst::new();
    add_wstring(&mut wide, "Grüße").unwrap();
    assert_eq!(wide.num_states(), 6);
    assert_eq!(wget_string(&wide).unwrap(), "Grüße");
}

#[test]
fn final_weights_survive_a_round_trip() {
    let mut fst = StdVectorFst::new();
    let last = add_string(&mut fst, "x").unwrap();
    fst.set_final(last, TropicalWeight(73.0)).unwrap();
    assert_eq!(fst.final_weight(last).unwrap(), Some(TropicalWeight(73.0)));
    assert!(!fst.is_final(0).unwrap());

    let copy = StdVectorFst::from_bytes(&fst.to_bytes().unwrap()).unwrap();
    assert_eq!(copy.final_weight(last).unwrap(), Some(TropicalWeight(73.0)));
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn write_read_verify() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.fst");

    let mut symbols = SymbolTable::with_epsilon("chars");
    for c in "helo".chars() {
        symbols.add_symbol_with_key(c.to_string(), Label::from(c)).unwrap();
    }
    let symbols = SharedSymbols::new(symbols);

    let mut fst = StdVectorFst::new();
    add_string(&mut fst, "hello").unwrap();
    fst.set_input_symbols(Some(symbols.clone()));
    fst.set_output_symbols(Some(symbols));
    verify(&fst).unwrap();
    fst.write(&path).unwrap();

    let back = StdVectorFst::read(&path).unwrap();
    verify(&back).unwrap();
    assert!(equal(&fst, &back, KDELTA).unwrap());
    assert_eq!(back.input_symbols().unwrap().find_key("o").unwrap(), Label::from('o'));
    assert_eq!(get_string(&back).unwrap(), "hello");

    // reading into an existing automaton replaces its contents
    let mut target = StdVectorFst::new();
    add_string(&mut target, "other").unwrap();
    target.read_into(&path).unwrap();
    assert_eq!(get_string(&target).unwrap(), "hello");
}

#[test]
fn reading_a_missing_or_foreign_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.fst");
    assert!(matches!(StdVectorFst::read(&missing), Err(FstError::Io(_))));

    let junk = dir.path().join("junk.fst");
    std::fs::write(&junk, b"not an automaton at all, just some text").unwrap();
    assert!(matches!(StdVectorFst::read(&junk), Err(FstError::Format(_))));
}

// ---------------------------------------------------------------------------
// Composition pipelines
// ---------------------------------------------------------------------------

#[test]
fn translate_through_closure_of_rules() {
    init_logging();
    let mut rules = StdVectorFst::new();
    add_translation(&mut rules, "a", "A", TropicalWeight::one()).unwrap();
    add_translation(&mut rules, "b", "B", TropicalWeight::one()).unwrap();
    closure_star(&mut rules).unwrap();

    let mut input = StdVectorFst::new();
    add_string(&mut input, "aaba").unwrap();

    let mut result = compose(&input, &rules).unwrap();
    project_output(&mut result).unwrap();
    rm_epsilon(&mut result).unwrap();
    let best = shortest_path(&result, 1).unwrap();
    assert_eq!(get_string(&best).unwrap(), "AABA");
}

#[test]
fn composing_with_identity_is_a_no_op() {
    let mut input = StdVectorFst::new();
    add_labels(&mut input, &bytes("abc"), &bytes("abc"), TropicalWeight(0.5)).unwrap();

    let mut identity = StdVectorFst::new();
    let s = identity.add_state();
    identity.set_start(s).unwrap();
    identity.set_final(s, TropicalWeight::one()).unwrap();
    for label in bytes("abc") {
        identity.add_arc(s, Arc::new(label, label, TropicalWeight::one(), s)).unwrap();
    }

    let left = compose(&input, &identity).unwrap();
    assert!(equal(&left, &input, KDELTA).unwrap());
    let right = compose(&identity, &input).unwrap();
    assert!(equal(&right, &input, KDELTA).unwrap());
}

#[test]
fn lazy_and_eager_composition_agree() {
    let mut rules = StdVectorFst::new();
    add_translation(&mut rules, "ab", "x", TropicalWeight(1.0)).unwrap();
    add_translation(&mut rules, "a", "y", TropicalWeight(3.0)).unwrap();
    add_translation(&mut rules, "b", "z", TropicalWeight(0.0)).unwrap();
    closure_star(&mut rules).unwrap();
    let mut input = StdVectorFst::new();
    add_string(&mut input, "abab").unwrap();

    let eager = compose(&input, &rules).unwrap();
    let mut lazy = ComposeFst::new(&input, &rules).unwrap();
    let start = lazy.start().unwrap();
    assert_eq!(lazy.num_known_states(), 1);
    assert!(!lazy.is_expanded(start));
    let expanded = lazy.to_vector_fst().unwrap();
    assert!(expanded.num_states() >= eager.num_states());

    let mut best = eager.clone();
    project(&mut best, ProjectType::Output).unwrap();
    rm_epsilon(&mut best).unwrap();
    let best = shortest_path(&best, 1).unwrap();
    assert_eq!(get_string(&best).unwrap(), "xx");
    assert_eq!(path_weight(&best), 2.0);
}

// ---------------------------------------------------------------------------
// Special matchers
// ---------------------------------------------------------------------------

#[test]
fn sigma_arc_matches_every_symbol() {
    const SIGMA: Label = 9;
    let mut a = StdVectorFst::new();
    a.add_states(2);
    a.set_start(0).unwrap();
    a.set_final(1, TropicalWeight::one()).unwrap();
    a.emplace_arc(0, 2, 2, TropicalWeight(0.0), 1).unwrap();
    a.emplace_arc(0, 3, 3, TropicalWeight(0.0), 1).unwrap();

    let mut b = StdVectorFst::new();
    b.add_states(1);
    b.set_start(0).unwrap();
    b.set_final(0, TropicalWeight::one()).unwrap();
    b.emplace_arc(0, SIGMA, 1, TropicalWeight(1.0), 0).unwrap();

    let opts = ComposeOptions {
        right: MatcherConfig::sigma(SIGMA),
        ..ComposeOptions::default()
    };
    let c = compose_with_options(&a, &b, &opts).unwrap();
    verify(&c).unwrap();
    let arcs: Vec<_> = c
        .arcs(c.start().unwrap())
        .unwrap()
        .iter()
        .map(|arc| (arc.ilabel, arc.olabel, arc.weight))
        .collect();
    assert_eq!(arcs, vec![(2, 1, TropicalWeight(1.0)), (3, 1, TropicalWeight(1.0))]);
}

#[test]
fn rho_arc_catches_the_rest() {
    const RHO: Label = 9;
    let mut a = StdVectorFst::new();
    a.add_states(2);
    a.set_start(0).unwrap();
    a.set_final(1, TropicalWeight::one()).unwrap();
    for label in [2, 3, 4] {
        a.emplace_arc(0, label, label, TropicalWeight(0.0), 1).unwrap();
    }

    let mut b = StdVectorFst::new();
    b.add_states(1);
    b.set_start(0).unwrap();
    b.set_final(0, TropicalWeight::one()).unwrap();
    b.emplace_arc(0, 2, 2, TropicalWeight(0.0), 0).unwrap();
    b.emplace_arc(0, RHO, RHO, TropicalWeight(1.0), 0).unwrap();

    let opts = ComposeOptions {
        right: MatcherConfig::rho(RHO),
        ..ComposeOptions::default()
    };
    let c = compose_with_options(&a, &b, &opts).unwrap();
    let arcs: Vec<_> = c
        .arcs(c.start().unwrap())
        .unwrap()
        .iter()
        .map(|arc| (arc.ilabel, arc.olabel, arc.weight.value()))
        .collect();
    // b is an acceptor, so both sides of the rho arc are rewritten
    assert_eq!(arcs, vec![(2, 2, 0.0), (3, 3, 1.0), (4, 4, 1.0)]);
}

#[test]
fn phi_arc_backs_off() {
    const PHI: Label = 1;
    // a backoff model: state 1 knows only "a", everything else falls back to
    // state 0 at a cost of 3
    let mut model = StdVectorFst::new();
    model.add_states(2);
    model.set_start(0).unwrap();
    model.set_final(1, TropicalWeight::one()).unwrap();
    model.emplace_arc(0, 97, 97, TropicalWeight(1.0), 1).unwrap();
    model.emplace_arc(0, 98, 98, TropicalWeight(2.0), 1).unwrap();
    model.emplace_arc(1, 97, 97, TropicalWeight(0.5), 1).unwrap();
    model.emplace_arc(1, PHI, 0, TropicalWeight(3.0), 0).unwrap();

    let opts = ComposeOptions {
        right: MatcherConfig::phi(PHI),
        ..ComposeOptions::default()
    };

    let mut known = StdVectorFst::new();
    add_string(&mut known, "aa").unwrap();
    let c = compose_with_options(&known, &model, &opts).unwrap();
    assert_eq!(get_output_string(&c).unwrap(), "aa");
    assert_eq!(path_weight(&c), 1.5);

    let mut backoff = StdVectorFst::new();
    add_string(&mut backoff, "ab").unwrap();
    let c = compose_with_options(&backoff, &model, &opts).unwrap();
    assert_eq!(get_output_string(&c).unwrap(), "ab");
    assert_eq!(path_weight(&c), 6.0);
}

#[test]
fn special_matcher_query_with_its_own_label_is_rejected() {
    const SIGMA: Label = 9;
    let mut a = StdVectorFst::new();
    add_labels(&mut a, &[SIGMA], &[SIGMA], TropicalWeight::one()).unwrap();
    let mut b = StdVectorFst::new();
    add_labels(&mut b, &[SIGMA], &[SIGMA], TropicalWeight::one()).unwrap();
    let opts = ComposeOptions {
        right: MatcherConfig::sigma(SIGMA),
        ..ComposeOptions::default()
    };
    assert!(matches!(
        compose_with_options(&a, &b, &opts),
        Err(FstError::Config(_))
    ));
}

// ---------------------------------------------------------------------------
// Epsilon removal and symbols
// ---------------------------------------------------------------------------

#[test]
fn rm_epsilon_through_cycles() {
    // 0 -eps-> 1 -eps-> 0, 1 -a-> 2 (final)
    let mut fst = StdVectorFst::new();
    fst.add_states(3);
    fst.set_start(0).unwrap();
    fst.set_final(2, TropicalWeight(0.5)).unwrap();
    fst.emplace_arc(0, 0, 0, TropicalWeight::one(), 1).unwrap();
    fst.emplace_arc(1, 0, 0, TropicalWeight::one(), 0).unwrap();
    fst.emplace_arc(1, 97, 97, TropicalWeight(2.0), 2).unwrap();
    rm_epsilon(&mut fst).unwrap();
    verify(&fst).unwrap();
    for s in fst.states() {
        assert_eq!(fst.num_input_epsilons(s).unwrap(), 0);
    }
    let best = shortest_path(&fst, 1).unwrap();
    assert_eq!(get_string(&best).unwrap(), "a");
    assert_eq!(path_weight(&best), 2.5);

    // the same cycle with a weight is refused
    let mut weighted = StdVectorFst::new();
    weighted.add_states(2);
    weighted.set_start(0).unwrap();
    weighted.set_final(1, TropicalWeight::one()).unwrap();
    weighted.emplace_arc(0, 0, 0, TropicalWeight(1.0), 1).unwrap();
    weighted.emplace_arc(1, 0, 0, TropicalWeight(1.0), 0).unwrap();
    assert!(matches!(
        rm_epsilon(&mut weighted),
        Err(FstError::EpsilonCycle { .. })
    ));
}

#[test]
fn convert_symbols_then_save() {
    let mut letters = SymbolTable::with_epsilon("letters");
    letters.add_symbol("x").unwrap();
    letters.add_symbol("y").unwrap();
    let mut reversed = SymbolTable::with_epsilon("reversed");
    reversed.add_symbol("y").unwrap();
    reversed.add_symbol("x").unwrap();
    let (letters, reversed) = (SharedSymbols::new(letters), SharedSymbols::new(reversed));

    let mut fst = StdVectorFst::new();
    add_labels(&mut fst, &[1, 2], &[2, 0], TropicalWeight::one()).unwrap();
    fst.set_input_symbols(Some(letters.clone()));
    fst.set_output_symbols(Some(letters));
    convert_symbols(&mut fst, &reversed, true, true).unwrap();
    assert_eq!(fst.get_arc(0, 0).unwrap().ilabel, 2);
    assert_eq!(fst.get_arc(0, 0).unwrap().olabel, 1);
    assert_eq!(fst.get_arc(1, 0).unwrap().olabel, 0);
    verify(&fst).unwrap();

    let back = StdVectorFst::from_bytes(&fst.to_bytes().unwrap()).unwrap();
    assert_eq!(back.input_symbols().unwrap().name(), "reversed");
    assert_eq!(back.output_symbols().unwrap().find_symbol(1).unwrap(), "y");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn options_deserialize_from_json() {
    let opts: ComposeOptions = serde_json::from_str(
        r#"{
            "right": { "layers": [{ "rho": 7 }, { "sigma": 8 }], "rewrite": "never" },
            "driver": "right",
            "connect": false
        }"#,
    )
    .unwrap();
    assert_eq!(opts.driver, ComposeDriver::Right);
    assert!(!opts.connect);
    assert_eq!(opts.left, MatcherConfig::standard(MatchType::Output));
    assert_eq!(opts.right.match_type, MatchType::Input);
    assert_eq!(opts.right.layers, vec![SpecialMatch::Rho(7), SpecialMatch::Sigma(8)]);
    assert!(opts.right.phi_loop);

    let empty: ComposeOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, ComposeOptions::default());

    let rm: RmEpsilonConfig = serde_json::from_str(r#"{ "connect": false }"#).unwrap();
    assert!(!rm.connect);
    assert_eq!(rm.delta, KDELTA);

    let sp: ShortestPathConfig = serde_json::from_str(r#"{ "nbest": 3 }"#).unwrap();
    assert_eq!(sp.nbest, 3);

    let round: ComposeOptions =
        serde_json::from_str(&serde_json::to_string(&opts).unwrap()).unwrap();
    assert_eq!(round, opts);
}
