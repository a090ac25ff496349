//! The bot's fixed command table and the text rules for picking a command
//! and its arguments out of a message.

pub const WELCOME_TEXT: &str = "\
🌟 **Welcome to the AI Lina Bot!** 🌟

I'm here to assist, entertain, and amaze you! Here's what I can do:

✨ **Ask Me Anything**
Use `/ask` to ask any question, and I'll provide an AI-powered answer!

🎨 **Imagine and Create**
Use `/imagine` to describe something, and I'll paint you a word picture.

🧮 **Solve Math Problems**
Need math help? Use `/math` and send your math problem for step-by-step solutions.

🌍 **Translate Text**
Say it in another language! Use `/translate` and provide a target language + text.

🔮 **Chat Freely**
Just message me directly—I'm all ears and ready to assist!

❓ **Help**
Use `/help` anytime to see this menu again.

🚀 Let's get started!
Type a command or send me a message and let the magic begin! ✨";

/// Reply for free chat when generation fails. Never includes the cause.
pub const CHAT_FALLBACK: &str = "I'm having trouble processing your message.";

/// How a failed generation call is reported back to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// "<prefix>: <error>"
    Surfaced(&'static str),
    /// Fixed text; the error is only logged.
    Hidden(&'static str),
}

impl Fallback {
    pub fn render(&self, error: &dyn std::fmt::Display) -> String {
        match self {
            Fallback::Surfaced(prefix) => format!("{}: {}", prefix, error),
            Fallback::Hidden(text) => (*text).to_string(),
        }
    }
}

/// Arguments a command expects after its trigger token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One free-text argument: everything after the trigger.
    Text,
    /// A target-language token followed by free text.
    LanguageAndText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Args<'a> {
    Text(&'a str),
    LanguageAndText { language: &'a str, text: &'a str },
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Reply with [`WELCOME_TEXT`] without calling the model.
    Welcome,
    Generate {
        arity: Arity,
        template: fn(Args<'_>) -> String,
        usage: &'static str,
        fallback: Fallback,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub trigger: &'static str,
    pub action: Action,
}

pub static COMMANDS: &[Command] = &[
    Command {
        trigger: "start",
        action: Action::Welcome,
    },
    Command {
        trigger: "help",
        action: Action::Welcome,
    },
    Command {
        trigger: "ask",
        action: Action::Generate {
            arity: Arity::Text,
            template: ask_prompt,
            usage: "Please provide a question after /ask",
            fallback: Fallback::Surfaced("Sorry, an error occurred"),
        },
    },
    Command {
        trigger: "imagine",
        action: Action::Generate {
            arity: Arity::Text,
            template: imagine_prompt,
            usage: "Please provide a description prompt after /imagine",
            fallback: Fallback::Surfaced("Imagination error"),
        },
    },
    Command {
        trigger: "math",
        action: Action::Generate {
            arity: Arity::Text,
            template: math_prompt,
            usage: "Please provide a math problem after /math",
            fallback: Fallback::Surfaced("Math solving error"),
        },
    },
    Command {
        trigger: "translate",
        action: Action::Generate {
            arity: Arity::LanguageAndText,
            template: translate_prompt,
            usage: "Usage: /translate [language] [text]",
            fallback: Fallback::Surfaced("Translation error"),
        },
    },
];

fn free_text(args: Args<'_>) -> &str {
    match args {
        Args::Text(text) => text,
        Args::LanguageAndText { text, .. } => text,
    }
}

fn ask_prompt(args: Args<'_>) -> String {
    free_text(args).to_string()
}

fn imagine_prompt(args: Args<'_>) -> String {
    format!("Describe a creative scene: {}", free_text(args))
}

fn math_prompt(args: Args<'_>) -> String {
    format!("Solve this math problem step by step: {}", free_text(args))
}

fn translate_prompt(args: Args<'_>) -> String {
    match args {
        Args::LanguageAndText { language, text } => {
            format!("Translate the following text to {}: {}", language, text)
        }
        Args::Text(_) => unreachable!("translate is parsed with Arity::LanguageAndText"),
    }
}

/// Split on the first whitespace character. The remainder has its leading
/// whitespace removed.
fn split_first_token(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (text, ""),
    }
}

/// Split a message into its command name and the text after it. Returns
/// `None` when the message does not start with `/`. A `@botname` suffix on
/// the token is dropped.
pub fn split_command(text: &str) -> Option<(&str, &str)> {
    let (token, rest) = split_first_token(text);
    let name = token.strip_prefix('/')?;
    let name = name.split_once('@').map_or(name, |(name, _)| name);
    Some((name, rest))
}

pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.trigger == name)
}

/// Extract the arguments for `arity` from the text following the trigger.
/// `None` means a required argument is missing.
pub fn parse_args(arity: Arity, rest: &str) -> Option<Args<'_>> {
    if rest.trim().is_empty() {
        return None;
    }
    match arity {
        Arity::Text => Some(Args::Text(rest)),
        Arity::LanguageAndText => {
            let (language, text) = split_first_token(rest);
            if text.trim().is_empty() {
                return None;
            }
            Some(Args::LanguageAndText { language, text })
        }
    }
}
