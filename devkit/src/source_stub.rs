/*!
Source hp-info scriptée

Rejoue une suite de réponses (sortie texte ou panne) ; la dernière réponse
est répétée une fois la suite épuisée.
*/

use ink2mqtt::error::{BridgeError, Result};
use ink2mqtt::StatusSource;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Failure(String),
}

#[derive(Clone, Default)]
pub struct ScriptedSource {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    last: Arc<Mutex<Option<Reply>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answers with `output`
    pub fn constant(output: impl Into<String>) -> Self {
        Self::new().then_output(output)
    }

    pub fn then_output(self, output: impl Into<String>) -> Self {
        self.replies.lock().push_back(Reply::Output(output.into()));
        self
    }

    pub fn then_failure(self, stderr: impl Into<String>) -> Self {
        self.replies.lock().push_back(Reply::Failure(stderr.into()));
        self
    }

    /// Number of times the bridge ran the "command"
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Option<Reply> {
        let mut last = self.last.lock();
        if let Some(reply) = self.replies.lock().pop_front() {
            *last = Some(reply);
        }
        last.clone()
    }
}

impl StatusSource for ScriptedSource {
    async fn dump(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            Some(Reply::Output(text)) => Ok(text),
            Some(Reply::Failure(stderr)) => Err(BridgeError::SourceExit {
                command: "sudo hp-info -i".to_string(),
                status: "exit status: 1".to_string(),
                stderr,
            }),
            None => Err(BridgeError::SourceOutput("no scripted reply".to_string())),
        }
    }
}
