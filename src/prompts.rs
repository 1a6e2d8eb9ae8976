//! Instruction template for describing document screenshots.
//!
//! Every prompt lives here so prompt changes never touch the request or
//! error-handling code in [`crate::pipeline::describe`]. Callers can override
//! the template via [`crate::config::ConversionConfig::prompt_template`].

use crate::config::CONTEXT_PLACEHOLDER;

/// Placeholder replaced by the human-readable target language name.
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Default instruction sent with every image.
///
/// Written in Portuguese because the produced manuals are Portuguese; the
/// closing sentence names the configured target language.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Esta é uma captura de tela de uma interface de software. \
Sua tarefa é descrevê-la para um manual. \
Primeiro, leia todo o texto visível na imagem, incluindo menus, nomes de pastas e botões. \
Depois, descreva a estrutura geral da tela. \
O texto do manual que acompanha esta imagem é: '{context}'. \
Use isso para focar sua descrição no que é mais relevante. \
Lembre-se que a resposta deve ser em {language}.";

/// Build the instruction for one image.
///
/// `context` is the nearest preceding non-empty text of the document (may be
/// empty). A custom `template` replaces the default one.
pub fn build_prompt(template: Option<&str>, context: &str, target_language: &str) -> String {
    template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .replace(LANGUAGE_PLACEHOLDER, language_name(target_language))
        .replace(CONTEXT_PLACEHOLDER, context)
}

/// Portuguese name of a language code, as used in the prompt.
fn language_name(code: &str) -> &str {
    match code {
        "pt" => "português",
        "en" => "inglês",
        "es" => "espanhol",
        "fr" => "francês",
        "de" => "alemão",
        "it" => "italiano",
        other => other,
    }
}
