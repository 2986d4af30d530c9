mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{reply, FakeBackend, Recorder, SharedRecorder};
use skillissue_client::api::models::SearchItem;
use skillissue_client::api::RequestBody;
use skillissue_client::storage::SqliteStore;
use skillissue_client::ui::favorites::{
    FavoriteKind, FavoriteToggle, FavoriteUpdate, ACTIVE_LABEL, INACTIVE_LABEL,
};
use skillissue_client::ui::filter::{DateRange, FilterUpdate, ListFilter};
use skillissue_client::ui::search::{LiveSearch, SearchUpdate, SEARCH_ALL_PATH, SEARCH_PATH};
use skillissue_client::ui::theme::{Theme, ThemeSwitch, ThemeView};
use skillissue_client::ui::Route;

fn catalog() -> serde_json::Value {
    json!([
        {"title": "Rust for beginners", "type": "руководство", "url": "/guides/1/"},
        {"title": "Selling a bike", "type": "объявление", "url": "/announcements/4/"},
        {"title": "Trusty Rusty", "type": "профиль", "url": "/users/rusty/"}
    ])
}

#[tokio::test]
async fn favorite_toggled_twice_returns_to_original_state() {
    let favorite = Arc::new(AtomicBool::new(false));
    let state = favorite.clone();
    let backend = FakeBackend::new(move |req| {
        assert_eq!(req.header_value("X-CSRFToken"), Some("csrf-1"));
        assert_eq!(req.body, RequestBody::Json(json!({"guide_id": "5"})));
        let now = !state.fetch_xor(true, Ordering::SeqCst);
        reply(200, json!({ "added": now }))
    });
    let mut toggle = FavoriteToggle::new(
        backend.clone(),
        Recorder::<FavoriteUpdate>::default(),
        FavoriteKind::Guide,
        5,
        Some("csrf-1".into()),
    );

    assert!(toggle.toggle().await.unwrap());
    assert!(!toggle.toggle().await.unwrap());
    assert!(!favorite.load(Ordering::SeqCst));

    let labels: Vec<_> = toggle
        .view()
        .updates
        .iter()
        .filter_map(|u| match u {
            FavoriteUpdate::Label(l) => Some(*l),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec![ACTIVE_LABEL, INACTIVE_LABEL]);
    assert_eq!(backend.calls()[0].path, "/guides/5/toggle-favorite/");
}

#[tokio::test]
async fn favorite_error_reply_is_alerted() {
    let backend = FakeBackend::new(|_| reply(404, json!({"error": "Announcement not found"})));
    let mut toggle = FavoriteToggle::new(
        backend,
        Recorder::<FavoriteUpdate>::default(),
        FavoriteKind::Announcement,
        8,
        None,
    );

    assert!(toggle.toggle().await.is_err());
    assert_eq!(
        toggle.view().updates,
        vec![FavoriteUpdate::Alert("Error: Announcement not found".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn search_uses_server_until_catalog_is_loaded() {
    let backend = FakeBackend::new(|req| {
        if req.path == SEARCH_ALL_PATH {
            reply(200, catalog())
        } else {
            reply(200, json!([{"title": "Rust for beginners", "type": "руководство", "url": "/guides/1/"}]))
        }
    });
    let view = SharedRecorder::default();
    let search = LiveSearch::new(backend.clone(), Box::new(view.clone()));

    search.search_now("Rust & co").await.unwrap();
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, format!("{}?q=Rust%20%26%20co", SEARCH_PATH));
    assert!(matches!(view.snapshot().last(), Some(SearchUpdate::Results(r)) if r.len() == 1));
}

#[tokio::test(start_paused = true)]
async fn loaded_catalog_answers_queries_locally() {
    let backend = FakeBackend::new(|req| {
        assert_eq!(req.path, SEARCH_ALL_PATH, "no per-query requests after catalog load");
        reply(200, catalog())
    });
    let view = SharedRecorder::default();
    let mut search = LiveSearch::new(backend.clone(), Box::new(view.clone()));

    search.focus().await;
    search.focus().await;
    assert!(search.is_catalog_loaded().await);

    search.input("RUST");
    tokio::time::sleep(Duration::from_millis(350)).await;
    search.input("bike");
    tokio::time::sleep(Duration::from_millis(350)).await;
    search.input("zzz");
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(backend.calls().len(), 1);
    let updates = view.snapshot();
    assert_eq!(updates.len(), 3);
    let SearchUpdate::Results(first) = &updates[0] else {
        panic!("expected results, got {:?}", updates[0]);
    };
    let titles: Vec<_> = first.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust for beginners", "Trusty Rusty"]);
    assert!(matches!(&updates[1], SearchUpdate::Results(r) if r[0].type_label() == "Announcement"));
    assert_eq!(updates[2], SearchUpdate::NoResults);
}

#[tokio::test(start_paused = true)]
async fn debounce_keeps_only_last_keystroke() {
    let backend = FakeBackend::new(|_| reply(200, json!([])));
    let view = SharedRecorder::default();
    let mut search = LiveSearch::new(backend.clone(), Box::new(view.clone()));

    search.input("r");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.input("ru");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.input("rus");
    tokio::time::sleep(Duration::from_millis(400)).await;

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, format!("{}?q=rus", SEARCH_PATH));
    assert_eq!(view.snapshot(), vec![SearchUpdate::NoResults]);

    search.input("  ");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(view.snapshot().last(), Some(&SearchUpdate::Hidden));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn selecting_search_item_navigates() {
    let backend = FakeBackend::new(|_| reply(200, json!([])));
    let view = SharedRecorder::default();
    let search = LiveSearch::new(backend, Box::new(view.clone()));

    let item = SearchItem {
        title: "Rust for beginners".into(),
        kind: "руководство".into(),
        url: "/guides/1/".into(),
    };
    search.select(&item).await;
    search.dismiss().await;
    assert_eq!(
        view.snapshot(),
        vec![
            SearchUpdate::Navigate(Route::Page("/guides/1/".into())),
            SearchUpdate::Hidden
        ]
    );
}

#[tokio::test]
async fn filter_restores_from_url_and_drops_unknown_date() {
    let backend = FakeBackend::new(|_| {
        reply(
            200,
            json!({"count": 1, "results": [
                {"id": 4, "title": "Selling a bike", "image": null, "author": "ann"}
            ]}),
        )
    });
    let mut filter = ListFilter::from_location(
        backend.clone(),
        Recorder::<FilterUpdate>::default(),
        "/announcements/",
        "?search=bike&date_filter=decade",
    )
    .expect("announcements page is filterable");

    filter.restore().await.unwrap();
    assert_eq!(filter.state().date, None);
    assert_eq!(backend.calls()[0].path, "/api/announcements/filter/?search=bike");

    let updates = &filter.view().updates;
    assert!(updates.contains(&FilterUpdate::Location("/announcements/?search=bike".into())));
    assert!(updates.contains(&FilterUpdate::Loading));
    let Some(FilterUpdate::Results(cards)) = updates.last() else {
        panic!("expected cards, got {:?}", updates.last());
    };
    assert_eq!(cards[0].href, "/announcements/4/");
    assert_eq!(cards[0].author, "ann");
    assert_eq!(cards[0].rating, None);
}

#[tokio::test]
async fn filter_applies_selected_values() {
    let backend = FakeBackend::new(|_| reply(200, json!({"count": 0, "results": []})));
    let mut filter =
        ListFilter::from_location(backend.clone(), Recorder::<FilterUpdate>::default(), "/guides/", "").unwrap();

    filter.restore().await.unwrap();
    assert!(backend.calls().is_empty());

    filter.set_search("async");
    filter.set_tags("rust");
    filter.select_date("month");
    filter.apply().await.unwrap();

    assert_eq!(filter.state().date, Some(DateRange::Month));
    assert_eq!(
        backend.calls()[0].path,
        "/api/guides/filter/?search=async&tags=rust&date_filter=month"
    );
    assert_eq!(filter.view().updates.last(), Some(&FilterUpdate::Empty));
}

#[tokio::test]
async fn filter_failure_renders_error_notice() {
    let backend = FakeBackend::new(|_| reply(500, json!({"error": "database is down"})));
    let mut filter =
        ListFilter::from_location(backend, Recorder::<FilterUpdate>::default(), "/guides/", "?tags=x").unwrap();

    assert!(filter.restore().await.is_err());
    assert_eq!(
        filter.view().updates.last(),
        Some(&FilterUpdate::Error("Failed to load data: database is down".into()))
    );
}

#[test]
fn filter_is_disabled_off_listing_pages() {
    let backend = FakeBackend::new(|_| reply(200, json!({})));
    assert!(ListFilter::from_location(backend.clone(), Recorder::<FilterUpdate>::default(), "/", "").is_none());
    assert!(ListFilter::from_location(backend, Recorder::<FilterUpdate>::default(), "/guides/3/", "").is_none());
}

#[derive(Default)]
struct Document {
    data_theme: Option<Theme>,
}

impl ThemeView for Document {
    fn apply(&mut self, theme: Theme) {
        self.data_theme = Some(theme);
    }
}

#[tokio::test(start_paused = true)]
async fn theme_survives_reload() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("store.sqlite");

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut switch = ThemeSwitch::new(store, Document::default());
        assert_eq!(switch.load(), Theme::Light);
        assert_eq!(switch.toggle().unwrap(), Theme::Dark);
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let mut switch = ThemeSwitch::new(store, Document::default());
    assert_eq!(switch.load(), Theme::Dark);
    assert_eq!(switch.view().data_theme, Some(Theme::Dark));
    assert_eq!(switch.reapply().await, Theme::Dark);
}
