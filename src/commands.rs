/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "projects",
    aliases: &["p", "project", "dashboard"],
    description: "Browse projects",
  },
  Command {
    name: "profile",
    aliases: &["me"],
    description: "View and edit your profile",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the current view",
  },
  Command {
    name: "logout",
    aliases: &["lo"],
    description: "Clear the stored session and exit",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit trak",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower)
      || cmd.aliases.iter().any(|a| a.contains(&input_lower))
    {
      4
    } else {
      continue;
    };

    matches.push((cmd, priority));
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
