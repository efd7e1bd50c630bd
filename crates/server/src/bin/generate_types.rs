use models::{Assignment, Athlete, CreateAssignment, EntityId, Program};
use server::routes::board::SearchRequest;
use services::services::{
    board::BoardEvent,
    board_view::{BoardView, ProgramColumn},
    move_resolver::{MoveCommand, MoveOutcome, MutationKind, NoOpReason},
};
use ts_rs::TS;

fn main() {
    let decls = [
        EntityId::decl(),
        Athlete::decl(),
        Program::decl(),
        Assignment::decl(),
        CreateAssignment::decl(),
        ProgramColumn::decl(),
        BoardView::decl(),
        MoveCommand::decl(),
        NoOpReason::decl(),
        MutationKind::decl(),
        MoveOutcome::decl(),
        BoardEvent::decl(),
        SearchRequest::decl(),
        "type ApiResponse<T> = { success: boolean, data: T | null, message: string | null };"
            .to_string(),
    ];

    println!("// This file was generated by `generate-types`. Do not edit by hand.\n");
    for decl in decls {
        println!("export {decl}\n");
    }
}
