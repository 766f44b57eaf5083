use crate::command::{ApplicationCommand, CommandResponse, ResponseData, StatusCode};
use crate::store::feed;
use crate::store::{now_millis, RecordStore, StoreError, UserRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::RwLock;

/// UserDirectory is the replica's copy of the social graph. Every record is held in memory and
/// written through to the record store before the in-memory copy changes.
pub struct UserDirectory {
    logger: slog::Logger,
    users: RwLock<HashMap<String, UserRecord>>,
    store: Box<dyn RecordStore>,
}

impl UserDirectory {
    pub fn new(logger: slog::Logger, store: Box<dyn RecordStore>) -> Self {
        UserDirectory {
            logger,
            users: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Fill the directory from the record store. Used when this replica starts as master.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let records = self.store.load_all().await?;
        let mut users = self.users.write().await;
        users.clear();
        for record in records {
            users.insert(record.username.clone(), record);
        }
        slog::info!(self.logger, "Loaded {} users from record store", users.len());

        Ok(users.len())
    }

    /// Replace everything with the records streamed from the master. Used when this replica
    /// joins as a follower.
    pub async fn install_all(&self, mut records: mpsc::Receiver<UserRecord>) -> Result<usize, StoreError> {
        let mut users = self.users.write().await;
        self.store.clear().await?;
        users.clear();

        while let Some(record) = records.recv().await {
            self.store.persist(&record).await?;
            users.insert(record.username.clone(), record);
        }
        slog::info!(self.logger, "Installed {} users from master", users.len());

        Ok(users.len())
    }

    pub async fn snapshot(&self) -> Vec<UserRecord> {
        self.users.read().await.values().cloned().collect()
    }

    pub async fn get(&self, username: &str) -> Option<UserRecord> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn apply(&self, command: ApplicationCommand) -> CommandResponse {
        let result = match command {
            ApplicationCommand::Signup { username, password } => self.signup(username, password).await,
            ApplicationCommand::DeleteAccount { username } => self.delete_account(&username).await,
            ApplicationCommand::Login { username, password } => Ok(self.login(&username, &password).await),
            ApplicationCommand::Follow { username, target } => self.follow(&username, &target).await,
            ApplicationCommand::Unfollow { username, target } => self.unfollow(&username, &target).await,
            ApplicationCommand::Search { searcher, target } => Ok(self.search(&searcher, &target).await),
            ApplicationCommand::Chirp {
                username,
                message,
                posted_at,
            } => self.chirp(&username, message, posted_at).await,
            ApplicationCommand::GetChirps { username } => Ok(self.get_chirps(&username).await),
        };

        result.unwrap_or_else(|e| {
            slog::error!(self.logger, "Record store failure: {}", e);
            CommandResponse::failed(StatusCode::InternalError)
        })
    }

    async fn signup(&self, username: String, password: String) -> Result<CommandResponse, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&username) {
            return Ok(CommandResponse::failed(StatusCode::DuplicateUser));
        }

        let record = UserRecord::new(username, password);
        self.store.persist(&record).await?;
        users.insert(record.username.clone(), record);

        Ok(CommandResponse::accepted())
    }

    async fn login(&self, username: &str, password: &str) -> CommandResponse {
        match self.users.read().await.get(username) {
            None => CommandResponse::failed(StatusCode::UserNotFound),
            Some(user) if !user.check_password(password) => CommandResponse::failed(StatusCode::IncorrectPassword),
            Some(_) => CommandResponse::accepted(),
        }
    }

    async fn delete_account(&self, username: &str) -> Result<CommandResponse, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(username) {
            return Ok(CommandResponse::failed(StatusCode::UserNotFound));
        }

        let mut unlinked = Vec::new();
        for (name, user) in users.iter() {
            if name == username {
                continue;
            }
            if user.is_following(username) || user.followed_by.iter().any(|f| f == username) {
                let mut user = user.clone();
                user.following.remove(username);
                user.followed_by.retain(|f| f != username);
                unlinked.push(user);
            }
        }

        for user in &unlinked {
            self.store.persist(user).await?;
        }
        self.store.remove(username).await?;

        for user in unlinked {
            users.insert(user.username.clone(), user);
        }
        users.remove(username);

        Ok(CommandResponse::accepted())
    }

    async fn follow(&self, username: &str, target: &str) -> Result<CommandResponse, StoreError> {
        let mut users = self.users.write().await;
        let (mut follower, mut followee) = match (users.get(username), users.get(target)) {
            (Some(follower), Some(followee)) => (follower.clone(), followee.clone()),
            _ => return Ok(CommandResponse::failed(StatusCode::UserNotFound)),
        };
        if username == target || follower.is_following(target) {
            return Ok(CommandResponse::failed(StatusCode::UserNotFollowed));
        }

        follower.following.insert(target.to_string());
        followee.followed_by.push(username.to_string());
        self.store.persist(&follower).await?;
        self.store.persist(&followee).await?;
        users.insert(follower.username.clone(), follower);
        users.insert(followee.username.clone(), followee);

        Ok(CommandResponse::succeeded(StatusCode::UserFollowed, ResponseData::None))
    }

    async fn unfollow(&self, username: &str, target: &str) -> Result<CommandResponse, StoreError> {
        let mut users = self.users.write().await;
        let (mut follower, mut followee) = match (users.get(username), users.get(target)) {
            (Some(follower), Some(followee)) => (follower.clone(), followee.clone()),
            _ => return Ok(CommandResponse::failed(StatusCode::UserNotFound)),
        };
        if !follower.is_following(target) {
            return Ok(CommandResponse::failed(StatusCode::UserNotFollowed));
        }

        follower.following.remove(target);
        followee.followed_by.retain(|f| f != username);
        self.store.persist(&follower).await?;
        self.store.persist(&followee).await?;
        users.insert(follower.username.clone(), follower);
        users.insert(followee.username.clone(), followee);

        Ok(CommandResponse::accepted())
    }

    async fn search(&self, searcher: &str, target: &str) -> CommandResponse {
        let users = self.users.read().await;
        if !users.contains_key(target) {
            return CommandResponse::failed(StatusCode::UserNotFound);
        }
        let following = users.get(searcher).map(|s| s.is_following(target)).unwrap_or(false);

        CommandResponse::succeeded(StatusCode::UserFound, ResponseData::Search { following })
    }

    async fn chirp(
        &self,
        username: &str,
        message: String,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<CommandResponse, StoreError> {
        let mut users = self.users.write().await;
        let mut user = match users.get(username) {
            Some(user) => user.clone(),
            None => return Ok(CommandResponse::failed(StatusCode::UserNotFound)),
        };

        user.write_post(message, posted_at.unwrap_or_else(now_millis));
        self.store.persist(&user).await?;
        users.insert(user.username.clone(), user);

        Ok(CommandResponse::accepted())
    }

    async fn get_chirps(&self, username: &str) -> CommandResponse {
        let users = self.users.read().await;
        let user = match users.get(username) {
            Some(user) => user,
            None => return CommandResponse::failed(StatusCode::UserNotFound),
        };

        let mut timelines = vec![user.posts.as_slice()];
        timelines.extend(
            user.following
                .iter()
                .filter_map(|followee| users.get(followee))
                .map(|followee| followee.posts.as_slice()),
        );

        let posts = feed::merge_newest_first(&timelines);
        CommandResponse::succeeded(StatusCode::Accepted, ResponseData::Posts(posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    /// Shares the record store with the test so persisted state can be checked directly.
    struct SharedStore(Arc<InMemoryRecordStore>);

    #[async_trait::async_trait]
    impl RecordStore for SharedStore {
        async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
            self.0.load_all().await
        }

        async fn persist(&self, record: &UserRecord) -> Result<(), StoreError> {
            self.0.persist(record).await
        }

        async fn remove(&self, username: &str) -> Result<(), StoreError> {
            self.0.remove(username).await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.0.clear().await
        }
    }

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn directory() -> (UserDirectory, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let directory = UserDirectory::new(test_logger(), Box::new(SharedStore(store.clone())));
        (directory, store)
    }

    fn signup(username: &str) -> ApplicationCommand {
        ApplicationCommand::Signup {
            username: username.into(),
            password: format!("{}-pw", username),
        }
    }

    fn follow(username: &str, target: &str) -> ApplicationCommand {
        ApplicationCommand::Follow {
            username: username.into(),
            target: target.into(),
        }
    }

    fn chirp_at(username: &str, message: &str, second: i64) -> ApplicationCommand {
        ApplicationCommand::Chirp {
            username: username.into(),
            message: message.into(),
            posted_at: Some(Utc.timestamp_opt(second, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn signup_and_login() {
        let (directory, store) = directory();

        assert_eq!(directory.apply(signup("alice")).await, CommandResponse::accepted());
        assert_eq!(
            directory.apply(signup("alice")).await,
            CommandResponse::failed(StatusCode::DuplicateUser)
        );
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        let login = |password: &str| ApplicationCommand::Login {
            username: "alice".into(),
            password: password.into(),
        };
        assert_eq!(directory.apply(login("alice-pw")).await, CommandResponse::accepted());
        assert_eq!(
            directory.apply(login("nope")).await,
            CommandResponse::failed(StatusCode::IncorrectPassword)
        );
        assert_eq!(
            directory
                .apply(ApplicationCommand::Login {
                    username: "bob".into(),
                    password: "x".into(),
                })
                .await,
            CommandResponse::failed(StatusCode::UserNotFound)
        );
    }

    #[tokio::test]
    async fn follow_rules() {
        let (directory, _store) = directory();
        directory.apply(signup("alice")).await;
        directory.apply(signup("bob")).await;

        let followed = directory.apply(follow("alice", "bob")).await;
        assert_eq!(followed.status, StatusCode::UserFollowed);
        assert!(followed.success);

        // Following twice, following yourself, and following nobody all fail.
        assert_eq!(
            directory.apply(follow("alice", "bob")).await,
            CommandResponse::failed(StatusCode::UserNotFollowed)
        );
        assert_eq!(
            directory.apply(follow("alice", "alice")).await,
            CommandResponse::failed(StatusCode::UserNotFollowed)
        );
        assert_eq!(
            directory.apply(follow("alice", "carol")).await,
            CommandResponse::failed(StatusCode::UserNotFound)
        );

        let bob = directory.get("bob").await.unwrap();
        assert_eq!(bob.followed_by, vec!["alice".to_string()]);

        let search = directory
            .apply(ApplicationCommand::Search {
                searcher: "alice".into(),
                target: "bob".into(),
            })
            .await;
        assert_eq!(
            search,
            CommandResponse::succeeded(StatusCode::UserFound, ResponseData::Search { following: true })
        );

        let unfollow = ApplicationCommand::Unfollow {
            username: "alice".into(),
            target: "bob".into(),
        };
        assert_eq!(directory.apply(unfollow.clone()).await, CommandResponse::accepted());
        assert_eq!(
            directory.apply(unfollow).await,
            CommandResponse::failed(StatusCode::UserNotFollowed)
        );
        assert!(directory.get("bob").await.unwrap().followed_by.is_empty());
    }

    #[tokio::test]
    async fn delete_unlinks_follow_graph() {
        let (directory, store) = directory();
        directory.apply(signup("alice")).await;
        directory.apply(signup("bob")).await;
        directory.apply(follow("alice", "bob")).await;
        directory.apply(follow("bob", "alice")).await;

        let deleted = directory
            .apply(ApplicationCommand::DeleteAccount {
                username: "bob".into(),
            })
            .await;

        assert_eq!(deleted, CommandResponse::accepted());
        assert!(directory.get("bob").await.is_none());
        let alice = directory.get("alice").await.unwrap();
        assert!(alice.following.is_empty());
        assert!(alice.followed_by.is_empty());

        let persisted = store.load_all().await.unwrap();
        assert_eq!(persisted, vec![alice]);
    }

    #[tokio::test]
    async fn feed_includes_followed_users_newest_first() {
        let (directory, _store) = directory();
        directory.apply(signup("alice")).await;
        directory.apply(signup("bob")).await;
        directory.apply(signup("carol")).await;
        directory.apply(follow("alice", "bob")).await;

        directory.apply(chirp_at("alice", "a1", 10)).await;
        directory.apply(chirp_at("bob", "b1", 20)).await;
        directory.apply(chirp_at("carol", "c1", 30)).await;
        directory.apply(chirp_at("alice", "a2", 40)).await;

        let response = directory
            .apply(ApplicationCommand::GetChirps {
                username: "alice".into(),
            })
            .await;

        let messages: Vec<String> = match response.data {
            ResponseData::Posts(posts) => posts.into_iter().map(|p| p.message).collect(),
            other => panic!("Unexpected response data {:?}", other),
        };
        assert_eq!(messages, vec!["a2", "b1", "a1"]);
    }

    #[tokio::test]
    async fn install_replaces_previous_contents() {
        let (directory, store) = directory();
        directory.apply(signup("stale")).await;

        let (tx, rx) = mpsc::channel(4);
        tx.send(UserRecord::new("alice", "pw")).await.unwrap();
        tx.send(UserRecord::new("bob", "pw")).await.unwrap();
        drop(tx);
        let installed = directory.install_all(rx).await.unwrap();

        assert_eq!(installed, 2);
        assert!(directory.get("stale").await.is_none());
        assert_eq!(store.load_all().await.unwrap().len(), 2);

        // And a fresh directory over the same store sees the same users.
        let reloaded = UserDirectory::new(test_logger(), Box::new(SharedStore(store)));
        assert_eq!(reloaded.load_all().await.unwrap(), 2);
        assert!(reloaded.get("alice").await.is_some());
    }
}
