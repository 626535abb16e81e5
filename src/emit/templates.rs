//! Embedded tera templates, one per [`ArtifactRole`].
//!
//! Templates are rendered from a serialized [`super::CollectionIr`], so every
//! variable is camelCase. Generated Vue code never uses mustache
//! interpolation; bindings go through attributes instead.

use super::ArtifactRole;

const STORAGE_SCHEMA: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { {{ tableFn }}, {{ builders | join(sep=", ") }} } from '{{ coreModule }}'
import { nanoid } from 'nanoid'

export const {{ names.tableExport }} = {{ tableFn }}('{{ names.table }}', {
{%- for c in columns %}
  {{ c.name }}: {{ c.builder }}('{{ c.columnName }}'{% if c.options %}, { {% for o in c.options %}{{ o.key }}: {{ o.value }}{% if not loop.last %}, {% endif %}{% endfor %} }{% endif %}){% for m in c.modifiers %}.{{ m }}{% endfor %},{% if c.comment %} // {{ c.comment }}{% endif %}
{%- endfor %}
})
{% if relations %}
// Relation stubs. Uncomment once the target tables are importable.
// import { relations } from 'drizzle-orm'
{%- for r in relations %}{% if r.targetModule %}
// import { {{ r.targetTable }} } from '{{ r.targetModule }}'
{%- else %}
// {{ r.field }} points at the external collection '{{ r.targetTable }}'
{%- endif %}{% endfor %}
//
// export const {{ names.tableExport }}Relations = relations({{ names.tableExport }}, ({ one }) => ({
{%- for r in relations %}
//   {{ r.relation }}: one({{ r.targetTable }}, { fields: [{{ names.tableExport }}.{{ r.field }}], references: [{{ r.targetTable }}.id] }),
{%- endfor %}
// }))
{% endif %}"#;

const SEED: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { {{ names.tableExport }} } from './schema'

export const {{ seed.constName }} = {{ seed.count }}

export function {{ names.tableExport }}SeedRows(teamId: string, owner: string) {
  return Array.from({ length: {{ seed.constName }} }, (_, i) => {
    const n = i + 1
    return {
      teamId,
      owner,
{%- for v in seed.values %}
      {{ v.name }}: {{ v.expr }},
{%- endfor %}
{%- if sortable %}
      order: i,
{%- endif %}
{%- if metadata %}
      createdBy: owner,
      updatedBy: owner,
{%- endif %}
    }
  })
}

export async function seed{{ names.uiPrefix }}(db: any, teamId: string, owner: string) {
  await db.insert({{ names.tableExport }}).values({{ names.tableExport }}SeedRows(teamId, owner))
}
"#;

const QUERIES: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { and, {% if sortable %}asc, {% endif %}eq, inArray } from 'drizzle-orm'
import { {{ names.tableExport }} } from './schema'
import type { {{ names.typeName }}, {{ names.newTypeName }} } from '../../../types/{{ names.kebab }}'

/** Raised when an update or delete matches no row the caller may touch. */
export class NotFoundOrUnauthorizedError extends Error {
  constructor(entity: string, id: string) {
    super(`${entity} ${id} not found or not accessible`)
    this.name = 'NotFoundOrUnauthorizedError'
  }
}

const table = {{ names.tableExport }}

export async function {{ operations.getAll }}(teamId: string): Promise<{{ names.typeName }}[]> {
  const db = useDB()
  return await db
    .select()
    .from(table)
    .where(eq(table.teamId, teamId)){% if sortable %}
    .orderBy(asc(table.order)){% endif %}
}

export async function {{ operations.getByIds }}(teamId: string, ids: string[]): Promise<{{ names.typeName }}[]> {
  if (ids.length === 0) return []
  const db = useDB()
  return await db
    .select()
    .from(table)
    .where(and(eq(table.teamId, teamId), inArray(table.id, ids)))
}

export async function {{ operations.create }}(
  data: {{ names.newTypeName }} & { teamId: string, owner: string{% if metadata %}, createdBy: string, updatedBy: string{% endif %} },
): Promise<{{ names.typeName }}> {
  const db = useDB()
  const [row] = await db.insert(table).values(data).returning()
  return row
}

export async function {{ operations.update }}(
  id: string,
  teamId: string,
  owner: string,
  updates: Partial<{{ names.newTypeName }}>,
): Promise<{{ names.typeName }}> {
  const db = useDB()
  const [row] = await db
    .update(table)
    .set({ ...updates{% if metadata %}, updatedBy: owner{% endif %} })
    .where(and(eq(table.id, id), eq(table.teamId, teamId), eq(table.owner, owner)))
    .returning()
  if (!row) throw new NotFoundOrUnauthorizedError('{{ names.typeName }}', id)
  return row
}

export async function {{ operations.delete }}(id: string, teamId: string, owner: string): Promise<void> {
  const db = useDB()
  const rows = await db
    .delete(table)
    .where(and(eq(table.id, id), eq(table.teamId, teamId), eq(table.owner, owner)))
    .returning({ id: table.id })
  if (rows.length === 0) throw new NotFoundOrUnauthorizedError('{{ names.typeName }}', id)
}
"#;

const COMPOSABLE: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import type { {{ names.newTypeName }} } from '../types/{{ names.kebab }}'

export function {{ names.composable }}() {
  const apiBase = (teamId: string) => `/api/teams/${teamId}/{{ names.apiSegment }}`

  const columns = [
{%- for f in fields %}
    { accessorKey: '{{ f.name }}', header: {{ f.labelTs }} },
{%- endfor %}
    { id: 'actions', header: '' },
  ]

  const defaultValue: Partial<{{ names.newTypeName }}> = {
{%- for f in fields %}
    {{ f.name }}: {{ f.formDefault }},
{%- endfor %}
  }

  return { apiBase, columns, defaultValue }
}
"#;

const HANDLER_GET_ALL: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { {{ operations.getAll }} } from '../../../../database/{{ names.kebab }}/queries'

export default defineEventHandler(async (event) => {
  const { team } = await resolveTeamAndCheckMembership(event)
  return await {{ operations.getAll }}(team.id)
})
"#;

const HANDLER_GET_BY_IDS: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { {{ operations.getByIds }} } from '../../../../database/{{ names.kebab }}/queries'

export default defineEventHandler(async (event) => {
  const { team } = await resolveTeamAndCheckMembership(event)
  const { ids } = getQuery(event)
  const list = String(ids ?? '')
    .split(',')
    .map(id => id.trim())
    .filter(Boolean)
  return await {{ operations.getByIds }}(team.id, list)
})
"#;

const HANDLER_CREATE: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { {{ operations.create }} } from '../../../../database/{{ names.kebab }}/queries'
import type { {{ names.newTypeName }} } from '../../../../../types/{{ names.kebab }}'

export default defineEventHandler(async (event) => {
  const { team, user } = await resolveTeamAndCheckMembership(event)
  const body = await readBody<{{ names.newTypeName }}>(event)
  return await {{ operations.create }}({
    ...body,
    teamId: team.id,
    owner: user.id,
{%- if metadata %}
    createdBy: user.id,
    updatedBy: user.id,
{%- endif %}
  })
})
"#;

const HANDLER_UPDATE: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { NotFoundOrUnauthorizedError, {{ operations.update }} } from '../../../../database/{{ names.kebab }}/queries'
import type { {{ names.newTypeName }} } from '../../../../../types/{{ names.kebab }}'

export default defineEventHandler(async (event) => {
  const { team, user } = await resolveTeamAndCheckMembership(event)
  const id = getRouterParam(event, '{{ names.idParam }}')
  if (!id) {
    throw createError({ statusCode: 400, statusMessage: 'Missing {{ names.idParam }}' })
  }
  const body = await readBody<Partial<{{ names.newTypeName }}>>(event)
  try {
    return await {{ operations.update }}(id, team.id, user.id, body)
  } catch (error) {
    if (error instanceof NotFoundOrUnauthorizedError) {
      throw createError({ statusCode: 404, statusMessage: error.message })
    }
    throw error
  }
})
"#;

const HANDLER_DELETE: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
import { NotFoundOrUnauthorizedError, {{ operations.delete }} } from '../../../../database/{{ names.kebab }}/queries'

export default defineEventHandler(async (event) => {
  const { team, user } = await resolveTeamAndCheckMembership(event)
  const id = getRouterParam(event, '{{ names.idParam }}')
  if (!id) {
    throw createError({ statusCode: 400, statusMessage: 'Missing {{ names.idParam }}' })
  }
  try {
    await {{ operations.delete }}(id, team.id, user.id)
    return { success: true }
  } catch (error) {
    if (error instanceof NotFoundOrUnauthorizedError) {
      throw createError({ statusCode: 404, statusMessage: error.message })
    }
    throw error
  }
})
"#;

const UI_LIST: &str = r#"<!-- Generated by crudkit for {{ names.layer }}/{{ names.collection }}. -->
<script setup lang="ts">
import type { {{ names.typeName }} } from '../../types/{{ names.kebab }}'
import {{ names.uiPrefix }}Table from './Table.vue'

defineProps<{ rows: {{ names.typeName }}[] }>()
const emit = defineEmits<{
  create: []
  edit: [row: {{ names.typeName }}]
  remove: [row: {{ names.typeName }}]
}>()
</script>

<template>
  <div class="crud-list">
    <header class="crud-list-header">
      <h2 v-text="'{{ names.title }}'" />
      <UButton icon="i-lucide-plus" label="New" @click="emit('create')" />
    </header>
    <{{ names.uiPrefix }}Table :rows="rows" @edit="row => emit('edit', row)" @remove="row => emit('remove', row)" />
    <p v-if="rows.length === 0" class="crud-empty" v-text="'Nothing here yet.'" />
  </div>
</template>
"#;

const UI_FORM: &str = r#"<!-- Generated by crudkit for {{ names.layer }}/{{ names.collection }}. -->
<script setup lang="ts">
import { reactive } from 'vue'
import type { {{ names.newTypeName }} } from '../../types/{{ names.kebab }}'
import { {{ names.composable }} } from '../../composables/{{ names.composable }}'

const props = defineProps<{ initial?: Partial<{{ names.newTypeName }}> }>()
const emit = defineEmits<{ submit: [value: Partial<{{ names.newTypeName }}>] }>()

const { defaultValue } = {{ names.composable }}()
const state = reactive({ ...defaultValue,{% if translations %} translations: {},{% endif %} ...props.initial })
</script>

<template>
  <UForm :state="state" class="crud-form" @submit="emit('submit', state)">
{%- for a in areas %}
    <section class="crud-area crud-area-{{ a.area }}">
{%- for f in a.fields %}
      <UFormField name="{{ f.name }}" label="{{ f.labelAttr }}"{% if f.required %} required{% endif %}>
{%- if f.translatable %}
        <TranslationsInput v-model="state.translations" field="{{ f.name }}">
          <{{ f.component }} v-model="state.{{ f.name }}"{% if f.attrs %} {{ f.attrs }}{% endif %} />
        </TranslationsInput>
{%- else %}
        <{{ f.component }} v-model="state.{{ f.name }}"{% if f.attrs %} {{ f.attrs }}{% endif %} />
{%- endif %}
      </UFormField>
{%- endfor %}
    </section>
{%- endfor %}
    <UButton type="submit" label="Save" />
  </UForm>
</template>
"#;

const UI_TABLE: &str = r#"<!-- Generated by crudkit for {{ names.layer }}/{{ names.collection }}. -->
<script setup lang="ts">
import type { {{ names.typeName }} } from '../../types/{{ names.kebab }}'
import { {{ names.composable }} } from '../../composables/{{ names.composable }}'

defineProps<{ rows: {{ names.typeName }}[] }>()
const emit = defineEmits<{
  edit: [row: {{ names.typeName }}]
  remove: [row: {{ names.typeName }}]
}>()

const { columns } = {{ names.composable }}()
</script>

<template>
  <UTable :data="rows" :columns="columns">
    <template #actions-cell="{ row }">
      <UButton icon="i-lucide-pencil" variant="ghost" @click="emit('edit', row.original)" />
      <UButton icon="i-lucide-trash" variant="ghost" color="error" @click="emit('remove', row.original)" />
    </template>
  </UTable>
</template>
"#;

const TYPE_DECL: &str = r#"// Generated by crudkit for {{ names.layer }}/{{ names.collection }}.
export interface {{ names.typeName }} {
{%- for m in typeMembers %}
  {{ m.name }}: {{ m.tsType }}
{%- endfor %}
}

export type {{ names.newTypeName }} = Omit<{{ names.typeName }}, '{{ omittedOnCreate | join(sep="' | '") }}'{% for d in defaultedOnCreate %} | '{{ d }}'{% endfor %}>{% if defaultedOnCreate %} & Partial<Pick<{{ names.typeName }}, '{{ defaultedOnCreate | join(sep="' | '") }}'>>{% endif %}
"#;

/// Template name and source for a role.
pub fn template_for(role: ArtifactRole) -> (&'static str, &'static str) {
    match role {
        ArtifactRole::Schema => ("schema.ts", STORAGE_SCHEMA),
        ArtifactRole::Seed => ("seed.ts", SEED),
        ArtifactRole::Queries => ("queries.ts", QUERIES),
        ArtifactRole::Composable => ("composable.ts", COMPOSABLE),
        ArtifactRole::HandlerGetAll => ("index.get.ts", HANDLER_GET_ALL),
        ArtifactRole::HandlerGetByIds => ("by-ids.get.ts", HANDLER_GET_BY_IDS),
        ArtifactRole::HandlerCreate => ("index.post.ts", HANDLER_CREATE),
        ArtifactRole::HandlerUpdate => ("update.patch.ts", HANDLER_UPDATE),
        ArtifactRole::HandlerDelete => ("delete.delete.ts", HANDLER_DELETE),
        ArtifactRole::List => ("List.vue", UI_LIST),
        ArtifactRole::Form => ("Form.vue", UI_FORM),
        ArtifactRole::Table => ("Table.vue", UI_TABLE),
        ArtifactRole::Types => ("types.ts", TYPE_DECL),
    }
}
