//! Executes controller commands against the backend

use std::collections::VecDeque;

use super::controller::ViewController;
use super::event::{Command, Event};
use crate::attachment;
use crate::client::ConversationApi;
use crate::session::KeyValueStore;

/// Perform one command and report its completion
pub async fn execute<A>(api: &A, command: Command) -> Event
where
    A: ConversationApi + ?Sized,
{
    match command {
        Command::StartupDelay(delay) => {
            tokio::time::sleep(delay).await;
            Event::StartupElapsed
        }
        Command::Login { username, password } => {
            Event::LoginCompleted(api.login(&username, &password).await)
        }
        Command::FetchHistory {
            user_id,
            recipient_id,
        } => {
            let result = api.fetch_history(&user_id, &recipient_id).await;
            Event::HistoryLoaded {
                user_id,
                recipient_id,
                result,
            }
        }
        Command::Send(draft) => Event::MessageSent(api.send(&draft).await),
        Command::EncodeAttachment { path, limit } => {
            Event::AttachmentEncoded(attachment::encode_file(&path, limit).await)
        }
    }
}

/// Drive the controller until no work is left.
///
/// Commands issued in the same round run concurrently; their completions are
/// handled in issue order.
pub async fn run_until_idle<S, A>(
    controller: &mut ViewController<S>,
    api: &A,
    commands: Vec<Command>,
) where
    S: KeyValueStore,
    A: ConversationApi + ?Sized,
{
    let mut pending: VecDeque<Command> = commands.into();
    while !pending.is_empty() {
        let round: Vec<_> = pending.drain(..).map(|c| execute(api, c)).collect();
        for event in futures::future::join_all(round).await {
            pending.extend(controller.handle(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, ClientResult, LoginResponse};
    use crate::model::{Message, MessageKind, User};
    use crate::session::{MemoryStore, SessionStore};
    use crate::view::{Action, AuthState, ControllerSettings, NoticeKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        sent: Mutex<Vec<Message>>,
        logins: Mutex<Vec<String>>,
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            avatar_url: String::new(),
            description: String::new(),
            username: None,
        }
    }

    #[async_trait]
    impl ConversationApi for FakeApi {
        async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
            self.logins.lock().push(username.to_string());
            if password == "pw" {
                Ok(LoginResponse {
                    user: user("u1"),
                    recipient: user("u2"),
                })
            } else {
                Err(ClientError::AuthRejected("bad credentials".to_string()))
            }
        }

        async fn fetch_history(&self, _: &str, _: &str) -> ClientResult<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn send(&self, draft: &Message) -> ClientResult<Message> {
            self.sent.lock().push(draft.clone());
            let mut confirmed = draft.clone();
            confirmed.timestamp = Some("2024-01-01T10:00:00Z".to_string());
            Ok(confirmed)
        }
    }

    fn settings() -> ControllerSettings {
        ControllerSettings {
            startup_delay: Duration::ZERO,
            ..ControllerSettings::default()
        }
    }

    #[test]
    fn test_login_and_send_round_trip() {
        tokio_test::block_on(async {
            let api = FakeApi::default();
            let mut ctl = ViewController::new(SessionStore::new(MemoryStore::new()), settings());

            let commands = ctl.start();
            run_until_idle(&mut ctl, &api, commands).await;
            assert_eq!(ctl.state().auth, AuthState::Unauthenticated);

            let commands = ctl.handle(
                Action::SubmitLogin {
                    username: "ALICE".to_string(),
                    password: "pw".to_string(),
                }
                .into(),
            );
            run_until_idle(&mut ctl, &api, commands).await;
            assert!(ctl.state().is_authenticated());
            assert_eq!(api.logins.lock().as_slice(), ["alice".to_string()]);

            ctl.handle(Action::InputChanged("hi".to_string()).into());
            let commands = ctl.handle(Action::Send.into());
            run_until_idle(&mut ctl, &api, commands).await;

            assert_eq!(api.sent.lock().len(), 1);
            assert_eq!(ctl.state().messages.len(), 1);
            assert_eq!(ctl.state().messages[0].kind, MessageKind::Text);
            assert!(ctl.state().input.is_empty());
        });
    }

    #[test]
    fn test_rejected_login_stays_on_form() {
        tokio_test::block_on(async {
            let api = FakeApi::default();
            let mut ctl = ViewController::new(SessionStore::new(MemoryStore::new()), settings());
            let commands = ctl.start();
            run_until_idle(&mut ctl, &api, commands).await;

            let commands = ctl.handle(
                Action::SubmitLogin {
                    username: "alice".to_string(),
                    password: "nope".to_string(),
                }
                .into(),
            );
            run_until_idle(&mut ctl, &api, commands).await;

            assert_eq!(ctl.state().auth, AuthState::Unauthenticated);
            assert_eq!(ctl.take_notices()[0].kind, NoticeKind::AuthRejected);
        });
    }

    #[test]
    fn test_oversized_attachment_skips_send() {
        tokio_test::block_on(async {
            let temp = tempfile::TempDir::new().unwrap();
            let path = temp.path().join("huge.png");
            std::fs::write(&path, vec![0u8; 500_001]).unwrap();

            let api = FakeApi::default();
            let store = SessionStore::new(MemoryStore::new());
            store
                .persist(&crate::model::Session::new(user("u1"), user("u2")))
                .unwrap();
            let mut ctl = ViewController::new(store, settings());
            let commands = ctl.start();
            run_until_idle(&mut ctl, &api, commands).await;

            let commands = ctl.handle(Action::AttachFile(path).into());
            run_until_idle(&mut ctl, &api, commands).await;

            assert!(api.sent.lock().is_empty());
            assert!(ctl.state().attachment.is_none());
            assert_eq!(ctl.take_notices()[0].kind, NoticeKind::AttachmentTooLarge);
        });
    }
}
