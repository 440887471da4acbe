mod common;

use common::{ids, open_test_db, Customer, Tag};
use rusqlite::Connection;
use sessionrepo_core::{
    EntityRepository, ExampleExpression, LikeType, Pageable, RepoError, SessionConfig,
    SessionRepository, Sort, SqliteSession,
};

fn seed_people(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO customer (id, name, email, city, age) VALUES (1, 'Alice', 'alice@example.com', 'Paris', 30);
         INSERT INTO customer (id, name, email, city, age) VALUES (2, 'alina', NULL, 'paris', 25);
         INSERT INTO customer (id, name, email, city, age) VALUES (3, 'Bob', 'bob@example.com', 'Berlin', 30);
         INSERT INTO customer (id, name, email, city, age) VALUES (4, '50%_off', NULL, NULL, NULL);",
    )
    .unwrap();
}

fn name_example(
    repo: &SessionRepository<'_, SqliteSession<'_>, Customer>,
    name: &str,
    case_insensitive: bool,
    like_type: LikeType,
) -> ExampleExpression {
    repo.example_of_with(Some(&Customer::named(name)), case_insensitive, like_type)
        .unwrap()
}

#[test]
fn exists_agrees_with_count_for_every_example() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let examples = vec![
        None,
        Some(repo.example_of(None).unwrap()),
        Some(name_example(&repo, "Alice", false, LikeType::Raw)),
        Some(name_example(&repo, "nobody", true, LikeType::Contains)),
        Some(repo.example_of(Some(&Customer::named("Bob").with_age(31))).unwrap()),
    ];

    for example in &examples {
        let count = repo.count_by_example(example.as_ref()).unwrap();
        let exists = repo.exists_by_example(example.as_ref()).unwrap();
        assert_eq!(exists, count > 0, "example {example:?}");
    }
    assert_eq!(repo.count_by_example(None).unwrap(), 4);
}

#[test]
fn universal_example_matches_everything() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let universal = repo.example_of(None).unwrap();
    assert!(universal.matches_all());
    assert_eq!(ids(&repo.find_all_by_example(Some(&universal)).unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(ids(&repo.find_all_by_example(None).unwrap()), vec![1, 2, 3, 4]);
}

#[test]
fn like_types_shape_text_matching() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);
    let matching = |name: &str, like_type: LikeType| {
        let example = name_example(&repo, name, false, like_type);
        ids(&repo.find_all_by_example(Some(&example)).unwrap())
    };

    assert_eq!(matching("Al%", LikeType::Raw), vec![1]);
    assert_eq!(matching("B_b", LikeType::Raw), vec![3]);
    assert_eq!(matching("Ali", LikeType::StartsWith), vec![1]);
    assert_eq!(matching("ice", LikeType::EndsWith), vec![1]);
    assert_eq!(matching("li", LikeType::Contains), vec![1, 2]);
    assert_eq!(matching("%_", LikeType::Contains), vec![4]);
    assert_eq!(matching("Ali", LikeType::EqualTo), Vec::<i64>::new());
    assert_eq!(matching("Alice", LikeType::EqualTo), vec![1]);
}

#[test]
fn case_insensitive_examples_fold_ascii_case() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);
    let matching = |name: &str, like_type: LikeType| {
        let example = name_example(&repo, name, true, like_type);
        ids(&repo.find_all_by_example(Some(&example)).unwrap())
    };

    assert_eq!(matching("al%", LikeType::Raw), vec![1, 2]);
    assert_eq!(matching("ALI", LikeType::StartsWith), vec![1, 2]);
    assert_eq!(matching("%_", LikeType::Contains), vec![4]);
    assert_eq!(matching("alice", LikeType::EqualTo), vec![1]);

    // The prototype's empty name still takes part in the match.
    let empty_name_in_paris = repo
        .example_of_with(
            Some(&Customer::named("").with_city("paris")),
            true,
            LikeType::EqualTo,
        )
        .unwrap();
    assert_eq!(repo.count_by_example(Some(&empty_name_in_paris)).unwrap(), 0);
}

#[test]
fn non_text_properties_match_by_equality() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let bob_at_30 = repo
        .example_of(Some(&Customer::named("Bob").with_age(30)))
        .unwrap();
    assert_eq!(ids(&repo.find_all_by_example(Some(&bob_at_30)).unwrap()), vec![3]);

    let paris = repo
        .example_of_with(
            Some(&Customer::named("%").with_city("PARIS")),
            true,
            LikeType::EqualTo,
        )
        .unwrap();
    assert_eq!(ids(&repo.find_all_by_example(Some(&paris)).unwrap()), Vec::<i64>::new());

    let paris = repo
        .example_of_with(
            Some(&Customer::named("%").with_city("PARIS")),
            true,
            LikeType::Raw,
        )
        .unwrap();
    assert_eq!(ids(&repo.find_all_by_example(Some(&paris)).unwrap()), vec![1, 2]);
}

#[test]
fn find_one_by_example_requires_a_unique_match() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let bob = name_example(&repo, "Bob", false, LikeType::EqualTo);
    assert_eq!(repo.find_one_by_example(Some(&bob)).unwrap().unwrap().id, Some(3));

    let zed = name_example(&repo, "Zed", false, LikeType::EqualTo);
    assert!(repo.find_one_by_example(Some(&zed)).unwrap().is_none());

    let err = repo.find_one_by_example(None).unwrap_err();
    assert!(matches!(err, RepoError::AmbiguousResult { count: 4, .. }));
}

#[test]
fn example_results_can_be_sorted() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let a = name_example(&repo, "a", true, LikeType::Contains);
    let sorted = repo
        .find_all_by_example_sorted(Some(&a), &Sort::desc("age"))
        .unwrap();
    let ids: Vec<i64> = sorted.iter().filter_map(|customer| customer.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn paged_example_queries_report_totals() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);
    let by_id = Pageable::first(3).with_sort(Sort::asc("id"));

    let first = repo.find_all_by_example_paged(None, Some(&by_id)).unwrap();
    assert_eq!(ids(&first.content), vec![1, 2, 3]);
    assert_eq!(first.total_elements, 4);
    assert_eq!(first.total_pages, 2);
    assert!(first.is_first());
    assert!(first.has_next());

    let second = repo
        .find_all_by_example_paged(None, Some(&by_id.next()))
        .unwrap();
    assert_eq!(ids(&second.content), vec![4]);
    assert!(second.is_last());
    assert!(second.has_previous());

    let beyond = repo
        .find_all_by_example_paged(None, Some(&Pageable::new(7, 3)))
        .unwrap();
    assert!(!beyond.has_content());
    assert_eq!(beyond.total_elements, 4);

    let thirty = repo
        .example_of(Some(&Customer::named("%").with_age(30)))
        .unwrap();
    let unpaged = repo.find_all_by_example_paged(Some(&thirty), None).unwrap();
    assert_eq!(ids(&unpaged.content), vec![1, 3]);
    assert_eq!(unpaged.total_elements, 2);
    assert_eq!(unpaged.total_pages, 1);
}

#[test]
fn page_size_is_capped_by_session_config() {
    let conn = open_test_db();
    seed_people(&conn);
    let config = SessionConfig {
        max_page_size: 2,
        ..SessionConfig::default()
    };
    let session = SqliteSession::with_config(&conn, config);
    let repo: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let page = repo
        .find_all_paged(&Pageable::first(50).with_sort(Sort::asc("id")))
        .unwrap();
    assert_eq!(page.size, 2);
    assert_eq!(ids(&page.content), vec![1, 2]);
    assert_eq!(page.total_pages, 2);

    let partial = repo
        .find_all_paged_selected(&Pageable::new(1, 2).with_sort(Sort::asc("id")), "(name)")
        .unwrap();
    assert_eq!(ids(&partial.content), vec![3, 4]);
    assert!(partial.content.iter().all(|customer| customer.city.is_none()));

    let err = repo
        .find_all_paged(&Pageable::new(9, 2).with_sort(Sort::asc("salary")))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownProperty { .. }));
}

#[test]
fn examples_of_another_entity_are_rejected() {
    let conn = open_test_db();
    seed_people(&conn);
    let session = SqliteSession::new(&conn);
    let customers: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);
    let tags: SessionRepository<'_, _, Tag> = SessionRepository::new(&session);

    let red = tags.example_of(Some(&Tag::labelled("red"))).unwrap();
    assert_eq!(red.entity(), "tag");

    for err in [
        customers.count_by_example(Some(&red)).unwrap_err(),
        customers.find_all_by_example(Some(&red)).unwrap_err(),
    ] {
        assert!(matches!(err, RepoError::QuerySyntax { .. }), "{err:?}");
    }
}
