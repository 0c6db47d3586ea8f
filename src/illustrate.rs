//! Stage-by-stage illustration of a topic: one image per progression stage
//! plus a written explanation.

use crate::conversation::ConversationClient;
use crate::error::{LlmError, Result};
use crate::images::{GeneratedImage, ImageBackend, ImageModel, ImageRequest};
use crate::llm::ChatBackend;
use crate::message::ConversationHistory;
use crate::prompts::EXPLAINER_PROMPT;
use tracing::info;

pub const PROGRESSION_STAGES: [&str; 5] = [
    "Early stage - initial symptoms barely visible",
    "Mild progression - early signs becoming apparent",
    "Moderate progression - clear manifestation of symptoms",
    "Advanced stage - significant presentation",
    "Severe stage - advanced characteristics",
];

pub const MAX_FRAMES: usize = PROGRESSION_STAGES.len();

#[derive(Debug, Clone)]
pub struct Frame {
    pub stage: &'static str,
    pub prompt: String,
    pub image: GeneratedImage,
}

#[derive(Debug, Clone)]
pub struct Illustration {
    pub topic: String,
    pub frames: Vec<Frame>,
    pub explanation: String,
}

pub fn frame_prompt(topic: &str, stage: &str) -> String {
    format!(
        "Educational medical-style illustration showing {topic} at this point: {stage}. \
         Clean, clear, informative diagram style with soft colors, suitable for teaching. \
         No text labels, not graphic."
    )
}

fn explanation_request(topic: &str, stages: &[&str]) -> String {
    let mut request = format!("Explain how {topic} progresses through these stages:\n");
    for (i, stage) in stages.iter().enumerate() {
        request.push_str(&format!("{}. {}\n", i + 1, stage));
    }
    request
}

pub struct Illustrator<'a, C, I: ?Sized> {
    chat: &'a ConversationClient<C>,
    images: &'a I,
}

impl<'a, C: ChatBackend, I: ImageBackend + ?Sized> Illustrator<'a, C, I> {
    pub fn new(chat: &'a ConversationClient<C>, images: &'a I) -> Self {
        Self { chat, images }
    }

    /// Generate `frames` stage images in order, then the explanation.
    /// The first failure aborts the run.
    pub async fn illustrate(&self, topic: &str, frames: usize) -> Result<Illustration> {
        if topic.trim().is_empty() {
            return Err(LlmError::input("Please describe a topic to illustrate"));
        }
        if frames == 0 || frames > MAX_FRAMES {
            return Err(LlmError::input(format!(
                "Number of frames must be between 1 and {MAX_FRAMES}"
            )));
        }

        let stages = &PROGRESSION_STAGES[..frames];
        let mut generated = Vec::with_capacity(frames);

        for (index, &stage) in stages.iter().enumerate() {
            info!(frame = index + 1, total = frames, "generating frame");
            let prompt = frame_prompt(topic, stage);
            let request = ImageRequest::new(prompt.clone(), ImageModel::DallE3);
            let image = self
                .images
                .generate(&request)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::MalformedResponse("no image returned".to_string()))?;

            generated.push(Frame {
                stage,
                prompt,
                image,
            });
        }

        let (explanation, _) = self
            .chat
            .send(
                &explanation_request(topic, stages),
                &ConversationHistory::new(),
                Some(EXPLAINER_PROMPT),
            )
            .await?;

        Ok(Illustration {
            topic: topic.to_string(),
            frames: generated,
            explanation,
        })
    }
}
