// Property 6 (§8): vector search is invoked with the raw query; BM25 with
// the expanded query. `SearchEngine::run_vector_search` takes the raw
// `query` string directly (never `expand(query)`) while `SearchEngine::search`
// only ever feeds `expand(query)` to the BM25 backend (src/search/engine.rs).
// This checks the expansion function itself stays additive and never
// mutates the original query text the vector path depends on.

use lumen_search_core::expand;

#[test]
fn expansion_is_additive_and_preserves_the_original_query_as_a_prefix() {
    let raw = "search function";
    let expanded = expand(raw);

    assert!(expanded.starts_with(raw), "expansion must not replace the original query text");
    assert_ne!(expanded, raw, "a query with known synonyms should actually expand");
}

#[test]
fn expansion_is_a_noop_for_queries_with_no_known_synonyms() {
    let raw = "xyzzy plugh";
    assert_eq!(expand(raw), raw);
}
