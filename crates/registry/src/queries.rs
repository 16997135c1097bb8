//! GraphQL documents sent to the registry

pub const GET_MEMBERS: &str = "
query GetTeachers {
    teachers: allTeachers {
        id
        name {
            honorific
            first
            last
        }
        absence {
            id
            name
        }
        fullyAbsent
    }
}
";

pub const GET_PERIOD_IDS: &str = "
query GetPeriodIds {
    periods: allPeriods {
        id
        name
    }
}
";

pub const GET_SHEET_ID: &str = "query GetId { id: currSpreadsheetId }";

pub const GET_REPORT_TO: &str = "query GetReportTo { reportTo: currReportTo }";

pub const SET_REPORT_TO: &str = "
mutation SetReportTo($reportTo: String!) {
    setReportTo(reportTo: $reportTo)
}
";

pub const CREATE_MEMBER: &str = "
mutation CreateTeacher($name: GraphQlTeacherName!, $pronouns: GraphQlPronounSet!) {
    teacher: addTeacher(name: $name, pronouns: $pronouns) {
        id
    }
}
";

pub const CHANGE_NAME: &str = "
mutation ChangeTeacherName($id: UUID!, $name: GraphQlTeacherName!) {
    teacher: updateTeacherName(id: $id, name: $name) {
        id
    }
}
";

pub const CHANGE_ABSENCE: &str = "
mutation ChangeTeacherAbsence($id: UUID!, $periods: [UUID!]!, $fullyAbsent: Boolean) {
    teacher: updateTeacherAbsence(id: $id, periods: $periods, fullyAbsent: $fullyAbsent) {
        id
    }
}
";

/// Operation name declared in a document
pub fn operation_name(document: &str) -> Option<&str> {
    let rest = document
        .trim_start()
        .strip_prefix("query")
        .or_else(|| document.trim_start().strip_prefix("mutation"))?;
    let name = rest
        .trim_start()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()?;
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(operation_name(GET_MEMBERS), Some("GetTeachers"));
        assert_eq!(operation_name(GET_PERIOD_IDS), Some("GetPeriodIds"));
        assert_eq!(operation_name(GET_SHEET_ID), Some("GetId"));
        assert_eq!(operation_name(GET_REPORT_TO), Some("GetReportTo"));
        assert_eq!(operation_name(SET_REPORT_TO), Some("SetReportTo"));
        assert_eq!(operation_name(CREATE_MEMBER), Some("CreateTeacher"));
        assert_eq!(operation_name(CHANGE_NAME), Some("ChangeTeacherName"));
        assert_eq!(operation_name(CHANGE_ABSENCE), Some("ChangeTeacherAbsence"));
        assert_eq!(operation_name("{ anonymous }"), None);
    }

    #[test]
    fn test_member_query_pulls_absence() {
        assert!(GET_MEMBERS.contains("fullyAbsent"));
        assert!(GET_MEMBERS.contains("absence {"));
    }
}
