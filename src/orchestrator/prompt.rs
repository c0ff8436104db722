//! Fixed prompt directives applied to every generation

use crate::provider::{GenerationRequest, Submission};

/// Quality, style and exclusion directives appended to the caller's prompt
pub const STYLE_DIRECTIVES: &str = "ultra-photorealistic, cinematic lighting, \
high detail, natural textures, \
no distortions, no artifacts, no woman, no person, no people, no men, no man";

/// Negative prompt sent with every generation
pub const NEGATIVE_PROMPT: &str = "blurry, distorted, unnatural anatomy, \
low resolution, artifacts, unrealistic, \
low quality, text, watermark, distorted ";

/// Images requested per generation
pub const NUM_IMAGES: u32 = 1;

pub fn augment(prompt: &str) -> String {
    format!("{}, {}", prompt, STYLE_DIRECTIVES)
}

/// Build the provider payload for a request
pub fn submission_for(request: &GenerationRequest) -> Submission {
    Submission {
        prompt: augment(request.prompt()),
        negative_prompt: NEGATIVE_PROMPT.to_string(),
        width: request.width(),
        height: request.height(),
        num_images: NUM_IMAGES,
    }
}
