use crate::util::truncate_str;

/// Characters of optimized content quoted in the screening prompt
pub const PROMPT_PREVIEW_CHARS: usize = 500;

pub const SCREENING_INSTRUCTIONS: &str = r#"Please provide:
1. Programming language (java/python/javascript/typescript/csharp/go/ruby/php/cpp/c/other)
2. Confidence level (0.0-1.0)
3. Code complexity (low/medium/high)
4. Is this a valid source code file? (yes/no)

Respond in this exact format:
LANGUAGE: [language]
CONFIDENCE: [0.0-1.0]
COMPLEXITY: [low/medium/high]
VALID: [yes/no]
REASON: [brief explanation]"#;

/// Fixed screening prompt wrapped around a compressed file preview.
pub fn screening_prompt(file_name: &str, size_bytes: u64, optimized_content: &str) -> String {
    format!(
        "Analyze this code file for screening purposes:\n\nFile: {}\nSize: {} bytes\nContent preview: {}\n\n{}\n",
        file_name,
        size_bytes,
        truncate_str(optimized_content, PROMPT_PREVIEW_CHARS),
        SCREENING_INSTRUCTIONS
    )
}
