use anyhow::Context;
use clap::{Parser, Subcommand};
use qedi_client::submit_sequentially;
use qedi_structs::profile::{LinkIcon, NewLink, Profile, ProfileDetails};
use qedi_structs::{ObjectId, SuiAddress};
use serde::Serialize;

use crate::shared::{GlobalArgs, Tool, print_json};

#[derive(Parser)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a profile by exactly one of username, id or owner.
    Show {
        #[arg(long, conflicts_with_all = ["id", "owner"])]
        username: Option<String>,
        #[arg(long, conflicts_with = "owner")]
        id: Option<ObjectId>,
        #[arg(long)]
        owner: Option<SuiAddress>,
    },
    Create {
        username: String,
        #[command(flatten)]
        details: DetailsArgs,
    },
    Update {
        profile_id: ObjectId,
        #[command(flatten)]
        details: DetailsArgs,
    },
    AddLink {
        profile_id: ObjectId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "link")]
        icon: LinkIcon,
    },
    /// Add links given as `title,url[,icon]`.
    AddLinks {
        profile_id: ObjectId,
        #[arg(long = "link", required = true, value_parser = parse_link)]
        links: Vec<NewLink>,
        /// One transaction per link instead of a single batch.
        #[arg(long)]
        sequential: bool,
    },
    Click {
        profile_id: ObjectId,
        link_index: u64,
        /// Let the relay sign as well as pay; needs --relay-url but no --key.
        #[arg(long)]
        anonymous: bool,
    },
}

#[derive(clap::Args)]
struct DetailsArgs {
    #[arg(long)]
    display_name: String,
    #[arg(long, default_value = "")]
    bio: String,
    #[arg(long, default_value = "")]
    avatar_url: String,
    #[arg(long, default_value = qedi_structs::profile::DEFAULT_THEME)]
    theme: String,
}

impl DetailsArgs {
    fn into_details(self) -> ProfileDetails {
        ProfileDetails {
            display_name: self.display_name,
            bio: self.bio,
            avatar_url: self.avatar_url,
            theme: self.theme,
        }
    }
}

fn parse_link(raw: &str) -> Result<NewLink, String> {
    let mut parts = raw.splitn(3, ',');
    let title = parts.next().unwrap_or_default().trim();
    let url = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| format!("expected title,url[,icon], got {raw:?}"))?;
    let icon = match parts.next() {
        Some(icon) => icon.trim().parse::<LinkIcon>().map_err(|err| err.to_string())?,
        None => LinkIcon::default(),
    };
    let link = NewLink::new(title, url, icon);
    link.validate().map_err(|err| err.to_string())?;
    Ok(link)
}

#[derive(Serialize)]
struct ShowOutput {
    found: bool,
    profiles: Vec<Profile>,
}

pub async fn run(args: Args, global: &GlobalArgs) -> anyhow::Result<()> {
    let tool = Tool::new(global).await?;
    let client = &tool.client;
    let builder = client.builder();
    match args.command {
        Command::Show { username, id, owner } => {
            let profiles = match (username, id, owner) {
                (Some(username), _, _) => client
                    .profile_by_username(&username)
                    .await?
                    .into_iter()
                    .collect(),
                (_, Some(id), _) => client.profile_by_id(id).await?.into_iter().collect(),
                (_, _, Some(owner)) => client.profiles_by_owner(owner).await?,
                _ => anyhow::bail!("pass one of --username, --id or --owner"),
            };
            print_json(&ShowOutput {
                found: !profiles.is_empty(),
                profiles,
            })?;
        }
        Command::Create { username, details } => {
            let tx = builder.create_profile(&username, &details.into_details())?;
            print_json(&tool.submit(&tx).await?)?;
        }
        Command::Update { profile_id, details } => {
            let tx = builder.update_profile(profile_id, &details.into_details())?;
            print_json(&tool.submit(&tx).await?)?;
        }
        Command::AddLink {
            profile_id,
            title,
            url,
            icon,
        } => {
            let tx = builder.add_link(profile_id, &NewLink::new(title, url, icon))?;
            print_json(&tool.submit(&tx).await?)?;
        }
        Command::AddLinks {
            profile_id,
            links,
            sequential,
        } => {
            if sequential {
                let result = submit_sequentially(&links, |link| {
                    let tool = &tool;
                    async move {
                        let tx = tool.client.builder().add_link(profile_id, &link)?;
                        tool.submit(&tx).await
                    }
                })
                .await;
                match result {
                    Ok(executed) => print_json(&executed)?,
                    Err(err) => {
                        print_json(&err.committed)?;
                        return Err(err.error).with_context(|| {
                            format!("{} of {} links committed", err.committed.len(), links.len())
                        });
                    }
                }
            } else {
                let tx = builder.add_links(profile_id, &links)?;
                print_json(&tool.submit(&tx).await?)?;
            }
        }
        Command::Click {
            profile_id,
            link_index,
            anonymous,
        } => {
            let executed = if anonymous {
                client.record_click_anonymous(profile_id, link_index).await?
            } else {
                tool.record_click(profile_id, link_index).await?
            };
            print_json(&executed)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_argument_forms() {
        let link = parse_link("GitHub, github.com/alice, github").unwrap();
        assert_eq!(link.title, "GitHub");
        assert_eq!(link.url, "github.com/alice");
        assert_eq!(link.icon, LinkIcon::Github);

        let link = parse_link("Blog,https://a.b").unwrap();
        assert_eq!(link.icon, LinkIcon::default());

        assert!(parse_link("no url").is_err());
        assert!(parse_link(",https://a.b").is_err());
        assert!(parse_link("x,https://a.b,myspace").is_err());
    }

    #[test]
    fn show_flags_conflict() {
        let parsed = Args::try_parse_from([
            "profile", "show", "--username", "alice", "--owner", "0x1",
        ]);
        assert!(parsed.is_err());
    }
}
