//! Tests for session store operations.

use std::sync::{Arc, Barrier};
use std::thread;
use tiktaktoes_server::{
    Mark, MoveRequest, Position, ResetPolicy, Session, SessionError, SessionStore, Square,
};

/// Plays `moves` as (position, mark) pairs, expecting each to succeed.
fn play(store: &SessionStore, id: &str, moves: &[(i64, Mark)]) -> Session {
    let mut last = None;
    for &(position, mark) in moves {
        last = Some(
            store
                .apply_move(id, MoveRequest::new(position, mark))
                .expect("Valid move"),
        );
    }
    last.expect("At least one move")
}

fn marks(session: &Session) -> Vec<Option<Mark>> {
    session.board().squares().iter().map(|s| s.mark()).collect()
}

#[test]
fn test_create_defaults() {
    let store = SessionStore::default();
    let session = store.create(None);

    assert_eq!(session.id().len(), 12);
    assert_eq!(session.current_turn(), Mark::X);
    assert!(!session.is_terminal());
    assert!(!session.is_draw());
    assert_eq!(session.winner(), None);
    assert!(!session.is_seated(Mark::X));
    assert!(!session.is_seated(Mark::O));
    assert_eq!(session.board().occupied_count(), 0);
}

#[test]
fn test_create_claims_creator_seat() {
    let store = SessionStore::default();
    let session = store.create(Some(Mark::O));
    assert!(session.is_seated(Mark::O));
    assert!(!session.is_seated(Mark::X));
    // Creator seat does not change who moves first
    assert_eq!(session.current_turn(), Mark::X);
}

#[test]
fn test_create_ids_are_unique() {
    let store = SessionStore::default();
    let mut ids: Vec<_> = (0..500).map(|_| store.create(None).id().to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 500);
    assert_eq!(store.len(), 500);
}

#[test]
fn test_get_unknown_session() {
    let store = SessionStore::default();
    assert!(store.get("missing").is_none());
    assert!(store.is_empty());
}

#[test]
fn test_join_claims_open_seat() {
    let store = SessionStore::default();
    let id = store.create(Some(Mark::X)).id().to_string();

    let session = store.join(&id, Mark::O).expect("Join failed");
    assert!(session.is_seated(Mark::X));
    assert!(session.is_seated(Mark::O));
    assert_eq!(store.get(&id).unwrap(), session);
}

#[test]
fn test_join_taken_seat_fails() {
    let store = SessionStore::default();
    let id = store.create(Some(Mark::X)).id().to_string();
    assert_eq!(store.join(&id, Mark::X), Err(SessionError::SeatTaken(Mark::X)));
}

#[test]
fn test_join_full_session_fails_with_seat_taken() {
    let store = SessionStore::default();
    let id = store.create(Some(Mark::X)).id().to_string();
    store.join(&id, Mark::O).expect("Join failed");
    assert_eq!(store.join(&id, Mark::O), Err(SessionError::SeatTaken(Mark::O)));
}

#[test]
fn test_join_unknown_session_fails() {
    let store = SessionStore::default();
    assert_eq!(
        store.join("nope", Mark::O),
        Err(SessionError::NotFound("nope".to_string()))
    );
}

#[test]
fn test_invalid_mark_string() {
    let err: SessionError = "Z".parse::<Mark>().unwrap_err().into();
    assert_eq!(err, SessionError::InvalidMark("Z".to_string()));
}

#[test]
fn test_turn_alternates() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();

    let mut expected = Mark::X;
    for position in [4, 0, 8, 2, 6] {
        let session = store
            .apply_move(&id, MoveRequest::new(position, expected))
            .expect("Valid move");
        if session.is_terminal() {
            break;
        }
        expected = expected.opponent();
        assert_eq!(session.current_turn(), expected);
    }
}

#[test]
fn test_row_win_scenario() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();

    let session = play(
        &store,
        &id,
        &[(0, Mark::X), (3, Mark::O), (1, Mark::X), (4, Mark::O), (2, Mark::X)],
    );

    use Mark::{O, X};
    assert_eq!(
        marks(&session),
        vec![Some(X), Some(X), Some(X), Some(O), Some(O), None, None, None, None]
    );
    assert_eq!(session.winner(), Some(X));
    assert!(session.is_terminal());
    assert!(!session.is_draw());
    // Turn is not flipped by the winning move
    assert_eq!(session.current_turn(), X);
}

#[test]
fn test_win_is_detected_on_the_completing_move() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();

    let before = play(&store, &id, &[(2, Mark::X), (0, Mark::O), (4, Mark::X), (1, Mark::O)]);
    assert!(!before.is_terminal());
    assert_eq!(before.winner(), None);

    let after = play(&store, &id, &[(6, Mark::X)]);
    assert_eq!(after.winner(), Some(Mark::X));
    assert!(after.is_terminal());
}

#[test]
fn test_draw_scenario() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();

    let session = play(
        &store,
        &id,
        &[
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (4, Mark::O),
            (3, Mark::X),
            (5, Mark::O),
            (7, Mark::X),
            (6, Mark::O),
            (8, Mark::X),
        ],
    );

    assert!(session.is_terminal());
    assert!(session.is_draw());
    assert_eq!(session.winner(), None);
    assert_eq!(session.board().occupied_count(), 9);
}

#[test]
fn test_out_of_range_position_rejected() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();

    for position in [-1, 9, 100, i64::MIN] {
        assert_eq!(
            store.apply_move(&id, MoveRequest::new(position, Mark::X)),
            Err(SessionError::InvalidPosition(position))
        );
    }
    assert_eq!(store.get(&id).unwrap().board().occupied_count(), 0);
}

#[test]
fn test_occupied_position_rejected() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();
    let before = play(&store, &id, &[(4, Mark::X)]);

    assert_eq!(
        store.apply_move(&id, MoveRequest::new(4, Mark::O)),
        Err(SessionError::PositionTaken(Position::Center))
    );
    assert_eq!(store.get(&id).unwrap(), before);
}

#[test]
fn test_wrong_turn_rejected() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();
    let before = store.get(&id).unwrap();

    assert_eq!(
        store.apply_move(&id, MoveRequest::new(0, Mark::O)),
        Err(SessionError::NotYourTurn(Mark::X))
    );
    assert_eq!(store.get(&id).unwrap(), before);
}

#[test]
fn test_move_after_game_over_rejected() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();
    let finished = play(
        &store,
        &id,
        &[(0, Mark::X), (3, Mark::O), (1, Mark::X), (4, Mark::O), (2, Mark::X)],
    );

    // Game over takes precedence over every other check
    for mv in [
        MoveRequest::new(8, Mark::O),
        MoveRequest::new(0, Mark::O),
        MoveRequest::new(42, Mark::X),
    ] {
        assert_eq!(store.apply_move(&id, mv), Err(SessionError::GameOver));
    }
    assert_eq!(store.get(&id).unwrap(), finished);
}

#[test]
fn test_move_on_unknown_session() {
    let store = SessionStore::default();
    assert_eq!(
        store.apply_move("ghost", MoveRequest::new(0, Mark::X)),
        Err(SessionError::NotFound("ghost".to_string()))
    );
}

#[test]
fn test_reset_keeps_seats_by_default() {
    let store = SessionStore::default();
    let id = store.create(Some(Mark::X)).id().to_string();
    store.join(&id, Mark::O).expect("Join failed");
    play(
        &store,
        &id,
        &[(0, Mark::X), (3, Mark::O), (1, Mark::X), (4, Mark::O), (2, Mark::X)],
    );

    let session = store.reset(&id).expect("Reset failed");
    assert_eq!(session.id(), id);
    assert_eq!(session.board().occupied_count(), 0);
    assert_eq!(session.current_turn(), Mark::X);
    assert!(!session.is_terminal());
    assert!(!session.is_draw());
    assert_eq!(session.winner(), None);
    assert!(session.is_seated(Mark::X));
    assert!(session.is_seated(Mark::O));

    // The game is playable again
    let session = play(&store, &id, &[(4, Mark::X)]);
    assert_eq!(session.board().get(Position::Center), Square::Occupied(Mark::X));
}

#[test]
fn test_reset_clear_seats_policy() {
    let store = SessionStore::new(ResetPolicy::ClearSeats);
    let id = store.create(Some(Mark::X)).id().to_string();
    store.join(&id, Mark::O).expect("Join failed");

    let session = store.reset(&id).expect("Reset failed");
    assert!(!session.is_seated(Mark::X));
    assert!(!session.is_seated(Mark::O));
    assert!(store.join(&id, Mark::X).is_ok());
}

#[test]
fn test_reset_unknown_session() {
    let store = SessionStore::default();
    assert_eq!(
        store.reset("nope"),
        Err(SessionError::NotFound("nope".to_string()))
    );
}

#[test]
fn test_list_sessions() {
    let store = SessionStore::default();
    let a = store.create(None).id().to_string();
    let b = store.create(None).id().to_string();

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(store.list(), expected);
}

#[test]
fn test_clones_share_sessions() {
    let store = SessionStore::default();
    let other = store.clone();
    let id = store.create(None).id().to_string();
    assert!(other.get(&id).is_some());
}

#[test]
fn test_concurrent_moves_on_same_square() {
    let store = SessionStore::default();
    let id = store.create(None).id().to_string();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            let id = id.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                store.apply_move(&id, MoveRequest::new(4, Mark::X))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let session = store.get(&id).unwrap();
    assert_eq!(session.board().occupied_count(), 1);
    assert_eq!(session.current_turn(), Mark::O);
}

#[test]
fn test_session_wire_format() {
    let store = SessionStore::default();
    let id = store.create(Some(Mark::X)).id().to_string();
    let session = play(&store, &id, &[(0, Mark::X)]);

    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": id,
            "board": ["X", null, null, null, null, null, null, null, null],
            "currentTurn": "O",
            "winner": null,
            "isOver": false,
            "isDraw": false,
            "playerXJoined": true,
            "playerOJoined": false,
        })
    );
}
