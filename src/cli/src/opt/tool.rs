/*
   Entra ID group to role synchronization
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[clap(about = "Role Synchronization Management Utility")]
pub enum RoleSyncOpt {
    /// Request a directory token using the configured client credentials and
    /// show when it expires.
    Token {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long)]
        config: Option<String>,
    },
    /// Resolve the role names for a groups link or a list of group ids. With
    /// neither, list every synced group in the directory.
    Groups {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long)]
        config: Option<String>,
        #[clap(long, conflicts_with = "id")]
        link: Option<String>,
        #[clap(long)]
        id: Vec<String>,
    },
    /// Check whether a username is permitted by the configured base domain.
    Authorize {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long)]
        config: Option<String>,
        #[clap(short = 'D', long = "username")]
        username: String,
    },
    /// Replay a login against a JSON host state file. The pre-authentication
    /// hook runs first, then the login hook, and the updated state is written
    /// back to the file.
    Sync {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long)]
        config: Option<String>,
        #[clap(long)]
        state: String,
        #[clap(long = "user-id")]
        user_id: u64,
        #[clap(long)]
        claims: String,
    },
    /// Show the version of this tool.
    Version {
        #[clap(short, long)]
        debug: bool,
    },
}

#[derive(Debug, clap::Parser)]
#[clap(about = "Role Synchronization Management Utility")]
pub struct RoleSyncParser {
    #[clap(subcommand)]
    pub commands: RoleSyncOpt,
}
