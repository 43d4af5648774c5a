//! Voice adapter — spoken conversation over the same session engine.
//!
//! The loop offers text or voice input each iteration. Reply fragments
//! stream into a sentence buffer; whole sentences are queued to a
//! background speaker task so synthesis latency never blocks the next
//! model call. A shutdown job drains the queue and stops the task.
//!
//! Microphone capture and speaker playback are device concerns behind
//! [`AudioDevice`]; transcription and synthesis are service concerns
//! behind the core speech traits.

use async_trait::async_trait;
use banter_core::error::InputError;
use banter_core::message::ConversationId;
use banter_core::speech::{SpeechToText, TextToSpeech};
use banter_engine::{SessionEngine, TurnOutcome};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The recording and playback device boundary.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Capture one utterance from the user.
    async fn record(&self) -> Result<Vec<u8>, InputError>;

    /// Play synthesized audio.
    async fn play(&self, audio: &[u8]) -> Result<(), InputError>;
}

/// Work items for the background speaker task.
pub enum SpeechJob {
    /// Synthesize and play this text.
    Speak(String),
    /// Drain whatever is queued, then stop.
    Shutdown,
}

/// Accumulates reply fragments and hands out speakable sentences.
///
/// A sentence is flushed when the buffer grows past `flush_chars`, or as
/// soon as a fragment ends with sentence punctuation.
pub struct SentenceBuffer {
    buf: String,
    flush_chars: usize,
}

impl SentenceBuffer {
    pub fn new(flush_chars: usize) -> Self {
        Self {
            buf: String::new(),
            flush_chars,
        }
    }

    /// Add a fragment; returns a sentence when one is ready to speak.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.buf.push_str(fragment);
        if self.buf.len() > self.flush_chars || fragment.ends_with(['.', '!', '?']) {
            return self.take();
        }
        None
    }

    /// Flush whatever remains after the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.buf);
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Interactive voice chat loop.
pub struct VoiceLoop {
    engine: Arc<SessionEngine>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    device: Arc<dyn AudioDevice>,
    conversation_id: ConversationId,
    flush_chars: usize,
}

impl VoiceLoop {
    pub fn new(
        engine: Arc<SessionEngine>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        device: Arc<dyn AudioDevice>,
    ) -> Self {
        Self {
            engine,
            stt,
            tts,
            device,
            conversation_id: ConversationId::new(),
            flush_chars: 20,
        }
    }

    pub fn with_flush_chars(mut self, flush_chars: usize) -> Self {
        self.flush_chars = flush_chars;
        self
    }

    /// Start the background speaker: synthesizes and plays queued
    /// sentences in order until it sees [`SpeechJob::Shutdown`].
    pub fn spawn_speaker(&self) -> (mpsc::UnboundedSender<SpeechJob>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SpeechJob>();
        let tts = self.tts.clone();
        let device = self.device.clone();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    SpeechJob::Speak(text) => {
                        match tts.synthesize(&text).await {
                            Ok(audio) => {
                                if let Err(e) = device.play(&audio).await {
                                    warn!(error = %e, "Playback failed");
                                }
                            }
                            Err(e) => warn!(error = %e, "Synthesis failed"),
                        }
                    }
                    SpeechJob::Shutdown => break,
                }
            }
            debug!("Speaker task stopped");
        });

        (tx, handle)
    }

    /// Run the loop until the user asks to leave.
    pub async fn run(&self) -> banter_core::Result<()> {
        let (speaker, speaker_handle) = self.spawn_speaker();

        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        loop {
            println!("\nChoose input mode: [1] Text  [2] Voice  [exit]");
            print!("Mode: ");
            let _ = std::io::stdout().flush();

            let mode = match lines.next_line().await {
                Ok(Some(line)) => line.trim().to_lowercase(),
                Ok(None) => String::from("exit"),
                Err(e) => {
                    eprintln!("input error: {e}");
                    String::from("exit")
                }
            };

            let user_input = match mode.as_str() {
                "exit" | "quit" => {
                    let _ = speaker.send(SpeechJob::Shutdown);
                    let _ = speaker_handle.await;
                    break;
                }
                "1" => {
                    print!("\nYou: ");
                    let _ = std::io::stdout().flush();
                    match lines.next_line().await {
                        Ok(Some(line)) => line.trim().to_string(),
                        _ => continue,
                    }
                }
                "2" => match self.listen().await {
                    Some(text) => text,
                    None => continue,
                },
                _ => {
                    println!("Invalid choice.");
                    continue;
                }
            };

            if user_input.is_empty() {
                continue;
            }

            if let Err(e) = self.speak_turn(&user_input, &speaker).await {
                eprintln!("\nerror: {e}");
            }
        }

        Ok(())
    }

    /// Capture one utterance and transcribe it. Neither failure kind
    /// aborts the loop — both just skip this turn, with distinct logs.
    async fn listen(&self) -> Option<String> {
        println!("\nListening... speak now");
        let audio = match self.device.record().await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "Recording failed");
                return None;
            }
        };

        match self.stt.transcribe(audio, "utterance.wav").await {
            Ok(text) => {
                println!("You said: {text}");
                Some(text)
            }
            Err(InputError::Unintelligible) => {
                warn!("Could not understand audio");
                println!("Could not understand audio.");
                None
            }
            Err(InputError::ServiceFailure(reason)) => {
                warn!(reason = %reason, "Speech recognition service failed");
                println!("Speech recognition error: {reason}");
                None
            }
        }
    }

    /// One streaming turn: print fragments as they arrive and queue
    /// completed sentences to the speaker.
    async fn speak_turn(
        &self,
        user_input: &str,
        speaker: &mpsc::UnboundedSender<SpeechJob>,
    ) -> banter_core::Result<TurnOutcome> {
        print!("\nAssistant: ");
        let _ = std::io::stdout().flush();

        let mut buffer = SentenceBuffer::new(self.flush_chars);
        let outcome = self
            .engine
            .turn_streaming(&self.conversation_id, user_input, |fragment| {
                print!("{fragment}");
                let _ = std::io::stdout().flush();
                if let Some(sentence) = buffer.push(fragment) {
                    let _ = speaker.send(SpeechJob::Speak(sentence));
                }
            })
            .await?;

        if let Some(rest) = buffer.finish() {
            let _ = speaker.send(SpeechJob::Speak(rest));
        }

        println!();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_core::error::GatewayError;
    use banter_core::gateway::{ChatReply, ChatRequest, ModelGateway, ReplyChunk};
    use banter_core::message::Role;
    use banter_engine::SessionOptions;
    use banter_store::InMemoryLog;
    use std::sync::Mutex;

    struct FragmentGateway {
        fragments: Vec<String>,
    }

    #[async_trait]
    impl ModelGateway for FragmentGateway {
        fn name(&self) -> &str {
            "fragments"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<ChatReply, GatewayError> {
            Ok(ChatReply {
                content: self.fragments.concat(),
                model: "stub".into(),
            })
        }

        async fn stream(
            &self,
            _request: ChatRequest,
        ) -> Result<
            mpsc::Receiver<Result<ReplyChunk, GatewayError>>,
            GatewayError,
        > {
            let (tx, rx) = mpsc::channel(8);
            let fragments = self.fragments.clone();
            tokio::spawn(async move {
                for fragment in fragments {
                    let _ = tx
                        .send(Ok(ReplyChunk {
                            content: fragment,
                            done: false,
                        }))
                        .await;
                }
                let _ = tx
                    .send(Ok(ReplyChunk {
                        content: String::new(),
                        done: true,
                    }))
                    .await;
            });
            Ok(rx)
        }
    }

    struct RecordingTts {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextToSpeech for RecordingTts {
        fn name(&self) -> &str {
            "recording"
        }

        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, InputError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(vec![0u8; 4])
        }
    }

    struct CountingDevice {
        plays: Arc<Mutex<usize>>,
        recording: Vec<u8>,
    }

    #[async_trait]
    impl AudioDevice for CountingDevice {
        async fn record(&self) -> Result<Vec<u8>, InputError> {
            Ok(self.recording.clone())
        }

        async fn play(&self, _audio: &[u8]) -> Result<(), InputError> {
            *self.plays.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct StubStt {
        result: Result<String, InputError>,
    }

    #[async_trait]
    impl SpeechToText for StubStt {
        fn name(&self) -> &str {
            "stub"
        }

        async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String, InputError> {
            self.result.clone()
        }
    }

    fn voice_loop(
        fragments: &[&str],
        stt_result: Result<String, InputError>,
    ) -> (VoiceLoop, Arc<Mutex<Vec<String>>>, Arc<Mutex<usize>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let plays = Arc::new(Mutex::new(0));
        let engine = Arc::new(SessionEngine::new(
            Arc::new(InMemoryLog::new()),
            Arc::new(FragmentGateway {
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
            }),
            SessionOptions::new("stub"),
        ));
        let voice = VoiceLoop::new(
            engine,
            Arc::new(StubStt { result: stt_result }),
            Arc::new(RecordingTts {
                spoken: spoken.clone(),
            }),
            Arc::new(CountingDevice {
                plays: plays.clone(),
                recording: vec![1, 2, 3],
            }),
        );
        (voice, spoken, plays)
    }

    #[test]
    fn buffer_flushes_on_sentence_punctuation() {
        let mut buffer = SentenceBuffer::new(20);
        assert_eq!(buffer.push("Hel"), None);
        assert_eq!(buffer.push("lo!"), Some("Hello!".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn buffer_flushes_past_char_threshold() {
        let mut buffer = SentenceBuffer::new(20);
        let long = "this fragment is well over the limit";
        assert_eq!(buffer.push(long), Some(long.to_string()));
    }

    #[test]
    fn buffer_holds_short_unpunctuated_text() {
        let mut buffer = SentenceBuffer::new(20);
        assert_eq!(buffer.push("short and"), None);
        assert_eq!(buffer.push(" open"), None);
        assert_eq!(buffer.finish(), Some("short and open".to_string()));
    }

    #[test]
    fn buffer_trims_and_drops_whitespace_only() {
        let mut buffer = SentenceBuffer::new(5);
        assert_eq!(buffer.push("   \n   "), None);
        assert_eq!(buffer.finish(), None);
    }

    #[tokio::test]
    async fn speaker_drains_queue_then_stops() {
        let (voice, spoken, plays) = voice_loop(&[], Ok(String::new()));
        let (tx, handle) = voice.spawn_speaker();

        tx.send(SpeechJob::Speak("first sentence.".into())).unwrap();
        tx.send(SpeechJob::Speak("second sentence.".into())).unwrap();
        tx.send(SpeechJob::Shutdown).unwrap();
        handle.await.unwrap();

        assert_eq!(
            *spoken.lock().unwrap(),
            vec!["first sentence.", "second sentence."]
        );
        assert_eq!(*plays.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn speak_turn_queues_sentences_and_records_reply() {
        let (voice, spoken, _plays) = voice_loop(&["Hel", "lo!", " More to say"], Ok(String::new()));
        let (tx, handle) = voice.spawn_speaker();

        let outcome = voice.speak_turn("greet me", &tx).await.unwrap();
        assert_eq!(outcome.reply.content, "Hello! More to say");

        tx.send(SpeechJob::Shutdown).unwrap();
        handle.await.unwrap();

        // One sentence flushed on '!', the remainder flushed at the end
        assert_eq!(*spoken.lock().unwrap(), vec!["Hello!", "More to say"]);

        let history = voice.engine.history(&voice.conversation_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Hello! More to say");
    }

    #[tokio::test]
    async fn unintelligible_audio_skips_the_turn() {
        let (voice, _spoken, _plays) = voice_loop(&[], Err(InputError::Unintelligible));
        assert_eq!(voice.listen().await, None);
    }

    #[tokio::test]
    async fn service_failure_also_skips_the_turn() {
        let (voice, _spoken, _plays) =
            voice_loop(&[], Err(InputError::ServiceFailure("whisper down".into())));
        assert_eq!(voice.listen().await, None);
    }

    #[tokio::test]
    async fn successful_transcription_returns_text() {
        let (voice, _spoken, _plays) = voice_loop(&[], Ok("turn on the lights".into()));
        assert_eq!(voice.listen().await, Some("turn on the lights".into()));
    }
}
