//! End-to-end conversation tests.
//!
//! Each test drives a `ConversationController` turn by turn and inspects the
//! replies captured by a `Transcript` and the state left in the store.

use std::sync::Arc;

use async_trait::async_trait;

use gloves_bot::bot::{ConversationController, InboundEvent, Participant, ROOT_DIALOG_ID, order_dialogs};
use gloves_bot::channels::Transcript;
use gloves_bot::config::BotConfig;
use gloves_bot::dialogs::{DialogSet, FrameState, StepDirective, WaterfallDialog};
use gloves_bot::error::{Error, StorageError};
use gloves_bot::store::{ConversationState, LibSqlStore, MemoryStore, StateStore};

const CONVERSATION: &str = "conv-1";

fn user() -> Participant {
    Participant::new("user-1", "Иван")
}

fn order_controller(store: Arc<dyn StateStore>) -> ConversationController {
    ConversationController::new(
        Arc::new(order_dialogs().unwrap()),
        ROOT_DIALOG_ID,
        store,
        BotConfig::default(),
    )
    .unwrap()
}

async fn say(controller: &ConversationController, text: &str) -> Vec<String> {
    let transcript = Transcript::new();
    controller
        .handle_turn(&InboundEvent::text(CONVERSATION, user(), text), &transcript)
        .await
        .unwrap();
    transcript.texts().await
}

async fn depth(store: &dyn StateStore) -> usize {
    store.load(CONVERSATION).await.unwrap().dialog_stack.depth()
}

#[tokio::test]
async fn full_order_from_join_to_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let controller = order_controller(store.clone());

    let transcript = Transcript::new();
    let joined = InboundEvent::members_added(
        CONVERSATION,
        user(),
        vec![Participant::new("bot", "Gloves"), user()],
    )
    .with_recipient("bot");
    controller.handle_turn(&joined, &transcript).await.unwrap();
    let welcome = transcript.texts().await;
    assert_eq!(welcome.len(), 1);
    assert!(welcome[0].starts_with("Привет Иван."));
    assert_eq!(depth(store.as_ref()).await, 0);

    let color = say(&controller, "hello").await;
    assert_eq!(
        color,
        ["Пожалуйста выберите цвет. (1) Желтый, (2) Зеленый или (3) Синий"]
    );
    assert_eq!(depth(store.as_ref()).await, 3);

    assert_eq!(say(&controller, "Зеленый").await, ["Пожалуйста введите полное имя."]);
    assert_eq!(say(&controller, "Иван Петров").await, ["Пожалуйста введите ваш город."]);
    assert_eq!(
        say(&controller, "Киев").await,
        ["Пожалуйста введите номер отделения Новой Почты."]
    );

    let confirmation = say(&controller, "5").await;
    assert_eq!(
        confirmation,
        ["Ваш заказ 'Перчатки Lovely Gloves (цвет Зеленый)' принят в обработку и будет \
          доставлен в отделение Новой Почты №5 города Киев, получатель Иван Петров"]
    );
    assert_eq!(depth(store.as_ref()).await, 0);
    assert!(store.load(CONVERSATION).await.unwrap().flags.welcomed);
}

#[tokio::test]
async fn choices_match_case_insensitively_and_by_ordinal() {
    let store = Arc::new(MemoryStore::new());
    let controller = order_controller(store.clone());

    say(&controller, "hi").await;
    assert_eq!(say(&controller, "  зеленый ").await, ["Пожалуйста введите полное имя."]);

    say(&controller, "отмена").await;
    say(&controller, "hi").await;
    assert_eq!(say(&controller, "3").await, ["Пожалуйста введите полное имя."]);
}

#[tokio::test]
async fn invalid_answers_reprompt_without_advancing() {
    let store = Arc::new(MemoryStore::new());
    let controller = order_controller(store.clone());

    say(&controller, "hi").await;
    let retry = say(&controller, "красный").await;
    assert_eq!(
        retry,
        ["Вы должны выбрать. (1) Желтый, (2) Зеленый или (3) Синий"]
    );
    assert_eq!(depth(store.as_ref()).await, 3);

    say(&controller, "Желтый").await;
    say(&controller, "Оля").await;
    say(&controller, "Львов").await;
    for attempt in ["abc", "пять", "12b"] {
        assert_eq!(
            say(&controller, attempt).await,
            ["Пожалуйста введите номер отделения Новой Почты."],
            "{attempt} should be rejected"
        );
    }

    let confirmation = say(&controller, "12").await;
    assert!(confirmation[0].contains("№12 города Львов"));
}

#[tokio::test]
async fn cancel_at_depth_unwinds_everything() {
    let store = Arc::new(MemoryStore::new());
    let controller = order_controller(store.clone());

    say(&controller, "hi").await;
    say(&controller, "Синий").await;
    say(&controller, "Иван Петров").await;
    assert_eq!(depth(store.as_ref()).await, 3);

    assert_eq!(say(&controller, "Отмена").await, ["Хорошо... отмена."]);
    assert_eq!(depth(store.as_ref()).await, 0);

    assert_eq!(say(&controller, "отмена").await, ["Нечего отменять :)"]);

    // Fresh start asks for the color again rather than resuming at the city.
    let restart = say(&controller, "hi").await;
    assert!(restart[0].starts_with("Пожалуйста выберите цвет."));
}

#[tokio::test]
async fn conversations_are_independent() {
    let store = Arc::new(MemoryStore::new());
    let controller = order_controller(store.clone());

    say(&controller, "hi").await;
    say(&controller, "Синий").await;

    let other = Transcript::new();
    controller
        .handle_turn(&InboundEvent::text("conv-2", user(), "hi"), &other)
        .await
        .unwrap();
    assert!(other.texts().await[0].starts_with("Пожалуйста выберите цвет."));

    assert_eq!(say(&controller, "Иван").await, ["Пожалуйста введите ваш город."]);
}

#[tokio::test]
async fn dialog_survives_restart_with_libsql() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let store = Arc::new(LibSqlStore::new_local(&path).await.unwrap());
        let controller = order_controller(store);
        say(&controller, "hi").await;
        say(&controller, "Желтый").await;
    }

    let store = Arc::new(LibSqlStore::new_local(&path).await.unwrap());
    let controller = order_controller(store);
    assert_eq!(say(&controller, "Иван Петров").await, ["Пожалуйста введите ваш город."]);
}

#[tokio::test]
async fn unknown_dialog_reference_apologizes_once_and_resets() {
    let mut dialogs = DialogSet::with_default_prompts();
    dialogs
        .add(
            WaterfallDialog::new(ROOT_DIALOG_ID)
                .step("begin_missing", |_step| Ok(StepDirective::begin("missing"))),
        )
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let controller = ConversationController::new(
        Arc::new(dialogs),
        ROOT_DIALOG_ID,
        store.clone(),
        BotConfig::default(),
    )
    .unwrap();

    assert_eq!(say(&controller, "hi").await, ["Ой. Что-то пошло не так!"]);
    assert_eq!(depth(store.as_ref()).await, 0);
}

/// Store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryStore,
}

#[async_trait]
impl StateStore for BrokenStore {
    async fn load(&self, conversation_id: &str) -> Result<ConversationState, StorageError> {
        self.inner.load(conversation_id).await
    }

    async fn save(&self, _conversation_id: &str, _state: &ConversationState) -> Result<(), StorageError> {
        Err(StorageError::Query("disk full".to_string()))
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, StorageError> {
        self.inner.delete(conversation_id).await
    }
}

#[tokio::test]
async fn storage_failure_sends_only_the_apology() {
    let controller = order_controller(Arc::new(BrokenStore::default()));
    let transcript = Transcript::new();

    let err = controller
        .handle_turn(&InboundEvent::text(CONVERSATION, user(), "hi"), &transcript)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Storage(StorageError::Query(_))));
    // The color prompt of the unsaved turn is withheld, and no detail leaks.
    assert_eq!(transcript.texts().await, ["Ой. Что-то пошло не так!"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_in_one_conversation_never_interleave() {
    const TURNS: usize = 20;
    let store = Arc::new(MemoryStore::new());
    let controller = Arc::new(order_controller(store.clone()));
    let transcript = Arc::new(Transcript::new());

    let handles: Vec<_> = (0..TURNS)
        .map(|_| {
            let controller = Arc::clone(&controller);
            let transcript = Arc::clone(&transcript);
            tokio::spawn(async move {
                controller
                    .handle_turn(&InboundEvent::text(CONVERSATION, user(), "hi"), transcript.as_ref())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // The first turn starts the order; every later one sees the color prompt
    // already waiting and is rejected by it.
    let texts = transcript.texts().await;
    assert_eq!(texts.len(), TURNS);
    let asked = texts
        .iter()
        .filter(|t| t.starts_with("Пожалуйста выберите цвет."))
        .count();
    let retried = texts
        .iter()
        .filter(|t| t.starts_with("Вы должны выбрать."))
        .count();
    assert_eq!(asked, 1);
    assert_eq!(retried, TURNS - 1);

    let state = store.load(CONVERSATION).await.unwrap();
    assert_eq!(state.dialog_stack.depth(), 3);
    let FrameState::Prompt(prompt) = &state.dialog_stack.active().unwrap().state else {
        panic!("color prompt should be active");
    };
    assert_eq!(prompt.attempts as usize, TURNS - 1);
}
