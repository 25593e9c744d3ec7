// Property 4 (§8): for a fixed index state, two identical queries produce
// identical result orderings.

use lumen_search_core::config::Bm25Config;
use lumen_search_core::Bm25Index;

#[test]
fn repeated_bm25_queries_return_identical_order() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let index = Bm25Index::open(&db, &Bm25Config::default()).unwrap();

    index
        .upsert(&[
            ("a".into(), "fn handle_auth_login() {}".into()),
            ("b".into(), "fn handle_auth_logout() {}".into()),
            ("c".into(), "fn render_page() {}".into()),
        ])
        .unwrap();

    let first = index.search("auth", 10);
    let second = index.search("auth", 10);
    assert_eq!(first, second);
}

#[test]
fn tie_scores_resolve_to_the_same_order_every_time() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let index = Bm25Index::open(&db, &Bm25Config::default()).unwrap();

    index
        .upsert(&[
            ("z".into(), "identical content".into()),
            ("m".into(), "identical content".into()),
            ("a".into(), "identical content".into()),
        ])
        .unwrap();

    let ids: Vec<String> = index.search("identical", 10).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["a".to_string(), "m".to_string(), "z".to_string()]);
}
