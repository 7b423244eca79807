pub mod accounts;
pub mod groups;
pub mod projects;
pub mod search;
pub mod tickets;

pub use accounts::{
    accept_invitation_handler, decline_invitation_handler, logout_handler, profile_handler,
    register_handler, signin_handler, update_profile_handler, user_handler,
};
pub use groups::{
    create_group_handler, delete_group_handler, edit_group_handler, group_handler,
    invite_to_group_handler, leave_group_handler, list_groups_handler, remove_group_member_handler,
};
pub use projects::{
    create_project_handler, delete_project_handler, edit_project_handler,
    invite_to_project_handler, list_projects_handler, project_handler,
    remove_project_member_handler,
};
pub use search::autocomplete_emails_handler;
pub use tickets::{
    add_subtask_handler, create_ticket_handler, download_attachment_handler, list_tickets_handler,
    subtask_status_handler, ticket_action_handler, ticket_handler, ticket_status_handler,
    update_ticket_handler, upload_attachment_handler,
};
