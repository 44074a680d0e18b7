use crate::types::transform_command::TransformCommand;

pub fn parse_transform_command(template: &str) -> Result<TransformCommand, String> {
    TransformCommand::parse_template(template)
}
