//! Integration tests for kanban boards, their documents and the ownership guard.

use db::{
    Db, SqliteStorage, Statement,
    models::{
        board::{Board, BoardList, Card, CardPlacement, UpdateCard},
        document::{BOARD_DOCUMENT_PLACEHOLDER, Document, DocumentScope, SaveDocument},
        ownership::Resource,
    },
};
use tempfile::TempDir;

async fn setup_db() -> (Db, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::open(&temp_dir.path().join("test.db"), 5)
        .await
        .expect("Failed to open database");
    (Db::new(storage), temp_dir)
}

async fn create_user(db: &Db, username: &str) -> i64 {
    db.run(
        Statement::new("INSERT INTO users (username, password_hash) VALUES (?, 'x')")
            .bind(username),
    )
    .await
    .expect("Failed to create user")
    .last_row_id
}

#[tokio::test]
async fn boards_get_consecutive_positions() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;

    let first = Board::create(&db, user, "First").await.unwrap();
    let second = Board::create(&db, user, "Second").await.unwrap();

    let boards = Board::find_by_user(&db, user).await.unwrap();
    assert_eq!(boards.len(), 2);
    assert_eq!((boards[0].id, boards[0].position), (first, 0));
    assert_eq!((boards[1].id, boards[1].position), (second, 1));
}

#[tokio::test]
async fn board_view_collects_lists_cards_and_root_documents() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_id = Board::create(&db, user, "Work").await.unwrap();
    let todo = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let done = BoardList::create(&db, board_id, "Done").await.unwrap();
    Card::create(&db, todo, "Write tests").await.unwrap();
    Card::create(&db, todo, "Ship").await.unwrap();
    Card::create(&db, done, "Plan").await.unwrap();
    for n in 0..4 {
        Document::create_board_root(&db, board_id, user, &format!("Doc {n}"))
            .await
            .unwrap();
    }

    let board = Board::find_by_id(&db, board_id).await.unwrap().unwrap();
    let view = Board::view(&db, board).await.unwrap();

    assert_eq!(view.lists.iter().map(|l| l.title.as_str()).collect::<Vec<_>>(), ["Todo", "Done"]);
    assert_eq!(view.cards.len(), 3);
    assert_eq!(view.documents.len(), 3);
}

#[tokio::test]
async fn card_update_stores_blank_fields_as_null() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_id = Board::create(&db, user, "Work").await.unwrap();
    let list = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let card_id = Card::create(&db, list, "Draft").await.unwrap();

    Card::update(
        &db,
        card_id,
        &UpdateCard {
            title: "Final".into(),
            description: Some(String::new()),
            due_date: Some("2025-04-01".into()),
            border_color: Some("#ff0000".into()),
            discord_notify: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let card = Card::find_by_id(&db, card_id).await.unwrap().unwrap();
    assert_eq!(card.title, "Final");
    assert_eq!(card.description, None);
    assert_eq!(card.due_date.as_deref(), Some("2025-04-01"));
    assert_eq!(card.border_color.as_deref(), Some("#ff0000"));
    assert!(card.discord_notify);
}

#[tokio::test]
async fn reorder_moves_cards_between_lists() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_id = Board::create(&db, user, "Work").await.unwrap();
    let todo = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let done = BoardList::create(&db, board_id, "Done").await.unwrap();
    let a = Card::create(&db, todo, "A").await.unwrap();
    let b = Card::create(&db, todo, "B").await.unwrap();

    Card::reorder(
        &db,
        &[
            CardPlacement { id: b, list_id: todo, position: 0 },
            CardPlacement { id: a, list_id: done, position: 0 },
        ],
    )
    .await
    .unwrap();

    let moved = Card::find_by_id(&db, a).await.unwrap().unwrap();
    assert_eq!((moved.list_id, moved.position), (done, 0));
    let stayed = Card::find_by_id(&db, b).await.unwrap().unwrap();
    assert_eq!((stayed.list_id, stayed.position), (todo, 0));
}

#[tokio::test]
async fn deleting_a_board_cascades_to_lists_cards_and_documents() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_id = Board::create(&db, user, "Work").await.unwrap();
    let list = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let card = Card::create(&db, list, "A").await.unwrap();
    let root = Document::ensure_card_root(&db, card, "A").await.unwrap();

    assert_eq!(Board::delete(&db, board_id).await.unwrap(), 1);
    assert!(Card::find_by_id(&db, card).await.unwrap().is_none());
    assert!(Document::find_by_id(&db, root.id).await.unwrap().is_none());
}

#[tokio::test]
async fn card_root_is_created_once_and_children_cascade() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_id = Board::create(&db, user, "Work").await.unwrap();
    let list = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let card = Card::create(&db, list, "Release notes").await.unwrap();

    let root = Document::ensure_card_root(&db, card, "Release notes").await.unwrap();
    let again = Document::ensure_card_root(&db, card, "Release notes").await.unwrap();
    assert_eq!(root.id, again.id);
    assert_eq!(root.title, "Release notes");

    let scope = DocumentScope::Card(card);
    let child = Document::create_child(&db, scope, root.id, "Notes", "<p>hi</p>")
        .await
        .unwrap();
    let tree = Document::tree(&db, scope).await.unwrap();
    assert_eq!(tree.iter().map(|d| d.id).collect::<Vec<_>>(), [root.id, child]);
    assert!(tree[0].is_root());

    Document::delete(&db, root.id).await.unwrap();
    assert!(Document::find_by_id(&db, child).await.unwrap().is_none());
}

#[tokio::test]
async fn board_document_save_is_scoped_to_its_board() {
    let (db, _dir) = setup_db().await;
    let user = create_user(&db, "alice").await;
    let board_a = Board::create(&db, user, "A").await.unwrap();
    let board_b = Board::create(&db, user, "B").await.unwrap();
    let doc = Document::create_board_root(&db, board_a, user, "Plan").await.unwrap();

    let stored = Document::find_by_id(&db, doc).await.unwrap().unwrap();
    assert_eq!(stored.content.as_deref(), Some(BOARD_DOCUMENT_PLACEHOLDER));

    let save = SaveDocument {
        title: "Plan v2".into(),
        content: "<p>done</p>".into(),
    };
    assert!(!Document::save(&db, DocumentScope::Board(board_b), doc, &save).await.unwrap());
    assert!(Document::save(&db, DocumentScope::Board(board_a), doc, &save).await.unwrap());
    assert_eq!(Document::count_roots(&db, DocumentScope::Board(board_a)).await.unwrap(), 1);
}

#[tokio::test]
async fn ownership_follows_the_join_chain() {
    let (db, _dir) = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let board_id = Board::create(&db, alice, "Work").await.unwrap();
    let list = BoardList::create(&db, board_id, "Todo").await.unwrap();
    let card = Card::create(&db, list, "A").await.unwrap();
    let doc = Document::ensure_card_root(&db, card, "A").await.unwrap();

    for resource in [
        Resource::Board(board_id),
        Resource::List(list),
        Resource::Card(card),
        Resource::CardDocument(doc.id),
    ] {
        assert!(resource.owned_by(&db, alice).await.unwrap(), "{resource}");
        assert!(!resource.owned_by(&db, bob).await.unwrap(), "{resource}");
    }
    assert!(!Resource::Card(9999).owned_by(&db, alice).await.unwrap());
    assert!(!Resource::BoardDocument(doc.id).owned_by(&db, alice).await.unwrap());
}
