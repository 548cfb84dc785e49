use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static PLUG: Emoji<'_, '_> = Emoji("🔌 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_step(step: &str) {
    println!("{} {}", SPARKLE, style(step).bold());
}

pub fn print_testing(url: &str) {
    println!("{} {} {}", PLUG, style("Testing").bold(), style(url).dim());
}

pub fn print_banner() {
    println!();
    println!("  {}", style("llm-onboard").bold().cyan());
    println!(
        "  {}\n",
        style("Bring your own LLM endpoint to the feedback platform.").dim()
    );
}

pub fn print_goodbye() {
    println!("\n{} {}", SPARKLE, style("Done.").bold().cyan());
}

enum GuideLine {
    Command(String, String),
    Status(String, String),
    Text(String),
    Hint(String, String),
    Blank,
}

/// Titled block of aligned help lines.
pub struct GuideSection {
    title: String,
    lines: Vec<GuideLine>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, about: &str) -> Self {
        self.lines
            .push(GuideLine::Command(name.to_string(), about.to_string()));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.lines
            .push(GuideLine::Status(label.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.lines.push(GuideLine::Text(text.to_string()));
        self
    }

    pub fn hint(mut self, command: &str, comment: &str) -> Self {
        self.lines
            .push(GuideLine::Hint(command.to_string(), comment.to_string()));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(GuideLine::Blank);
        self
    }

    pub fn print(self) {
        println!("\n{}", style(&self.title).bold().underlined());
        let width = self
            .lines
            .iter()
            .filter_map(|l| match l {
                GuideLine::Command(name, _) => Some(name.len()),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        for line in &self.lines {
            match line {
                GuideLine::Command(name, about) => println!(
                    "  {}  {}",
                    style(format!("{:<width$}", name, width = width)).green(),
                    about
                ),
                GuideLine::Status(label, value) => {
                    println!("  {}: {}", style(label).bold(), value)
                }
                GuideLine::Text(text) => println!("  {}", text),
                GuideLine::Hint(command, comment) if comment.is_empty() => {
                    println!("  {} {}", style("$").dim(), command)
                }
                GuideLine::Hint(command, comment) => println!(
                    "  {} {}    {}",
                    style("$").dim(),
                    command,
                    style(format!("# {}", comment)).dim()
                ),
                GuideLine::Blank => println!(),
            }
        }
    }
}
